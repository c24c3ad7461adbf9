use std::time::Duration;

use super::*;
use crate::state::model::GeneratorState;
use crate::state::owner::StateOwner;
use crate::state::scenes::MemorySceneStore;

fn msg(addr: &str, args: Vec<OscType>) -> OscMessage {
    OscMessage {
        addr: addr.to_owned(),
        args,
    }
}

#[test]
fn documented_addresses_map_to_deltas() {
    assert_eq!(
        message_to_delta(&msg("/pixli/preset/load", vec![OscType::String("intro".into())])),
        Ok(StateDelta::LoadScene("intro".into()))
    );
    assert_eq!(
        message_to_delta(&msg("/pixli/preset/load", vec![OscType::Int(2)])),
        Ok(StateDelta::LoadPreset(2))
    );
    assert_eq!(
        message_to_delta(&msg("/pixli/motion/intensity", vec![OscType::Float(75.0)])),
        Ok(StateDelta::Set(Param::MotionIntensity, 75.0))
    );
    assert_eq!(
        message_to_delta(&msg("/pixli/palette/cycle", vec![OscType::Int(1)])),
        Ok(StateDelta::PaletteCycling(true))
    );
    assert_eq!(
        message_to_delta(&msg("/pixli/palette/cycle", vec![OscType::Bool(false)])),
        Ok(StateDelta::PaletteCycling(false))
    );
    assert_eq!(
        message_to_delta(&msg("/pixli/sequence/next", vec![])),
        Ok(StateDelta::SequenceNext)
    );
    assert_eq!(
        message_to_delta(&msg("/pixli/sequence/previous", vec![])),
        Ok(StateDelta::SequencePrevious)
    );
    assert_eq!(
        message_to_delta(&msg("/pixli/motion/mode", vec![OscType::String("spiral".into())])),
        Ok(StateDelta::MovementMode(MovementMode::Spiral))
    );
    assert_eq!(
        message_to_delta(&msg("/pixli/blend/mode", vec![OscType::String("screen".into())])),
        Ok(StateDelta::BlendMode(BlendMode::Screen))
    );
}

#[test]
fn malformed_and_out_of_range_messages_are_rejected() {
    let bad = [
        msg("/pixli/motion/intensity", vec![OscType::Float(150.0)]),
        msg("/pixli/motion/intensity", vec![OscType::String("high".into())]),
        msg("/pixli/motion/intensity", vec![]),
        msg("/pixli/palette/cycle", vec![OscType::Int(2)]),
        msg("/pixli/preset/load", vec![OscType::Int(9)]),
        msg("/pixli/unknown", vec![]),
        msg("/other/motion/intensity", vec![OscType::Float(1.0)]),
    ];
    for m in &bad {
        let err = message_to_delta(m).unwrap_err();
        assert_eq!(err.protocol, "osc");
        assert!(err.message.starts_with(&m.addr), "{}", err.message);
    }
}

#[test]
fn bundles_flatten_in_order() {
    let bundle = OscPacket::Bundle(rosc::OscBundle {
        timetag: rosc::OscTime { seconds: 0, fractional: 1 },
        content: vec![
            OscPacket::Message(msg("/a", vec![])),
            OscPacket::Bundle(rosc::OscBundle {
                timetag: rosc::OscTime { seconds: 0, fractional: 1 },
                content: vec![OscPacket::Message(msg("/b", vec![]))],
            }),
            OscPacket::Message(msg("/c", vec![])),
        ],
    });
    let mut out = Vec::new();
    flatten_packet(bundle, &mut out);
    let addrs: Vec<&str> = out.iter().map(|m| m.addr.as_str()).collect();
    assert_eq!(addrs, vec!["/a", "/b", "/c"]);
}

#[tokio::test]
async fn udp_messages_reach_the_queue_and_bad_ones_are_dropped() {
    let mut owner =
        StateOwner::new(GeneratorState::default(), std::sync::Arc::new(MemorySceneStore::new()))
            .unwrap();
    let ctx = AdapterContext::new(owner.handle(), std::sync::Arc::clone(owner.scenes()));
    let mut osc = OscAdapter::new(
        ctx,
        OscSettings {
            bind: "127.0.0.1:0".parse().unwrap(),
            ..OscSettings::default()
        },
    );
    osc.connect().await.unwrap();
    let addr = osc.local_addr().unwrap();

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(b"garbage", addr).await.unwrap();
    let bytes = rosc::encoder::encode(&OscPacket::Message(msg(
        "/pixli/motion/intensity",
        vec![OscType::Float(12.0)],
    )))
    .unwrap();
    sender.send_to(&bytes, addr).await.unwrap();

    let mut intensity = 50.0;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        intensity = owner.begin_frame().snapshot.state.motion_intensity;
        if intensity == 12.0 {
            break;
        }
    }
    assert_eq!(intensity, 12.0);
    osc.disconnect();
    assert_eq!(osc.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn feedback_goes_to_reply_address() {
    let owner =
        StateOwner::new(GeneratorState::default(), std::sync::Arc::new(MemorySceneStore::new()))
            .unwrap();
    let surface = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let ctx = AdapterContext::new(owner.handle(), std::sync::Arc::clone(owner.scenes()));
    let mut osc = OscAdapter::new(
        ctx,
        OscSettings {
            bind: "127.0.0.1:0".parse().unwrap(),
            reply_to: Some(surface.local_addr().unwrap()),
            ..OscSettings::default()
        },
    );
    assert!(osc.send_intensity(1.0).await.is_err());
    osc.connect().await.unwrap();
    osc.send_intensity(42.0).await.unwrap();

    let mut buf = [0u8; 512];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), surface.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    let (_, packet) = rosc::decoder::decode_udp(&buf[..n]).unwrap();
    let OscPacket::Message(m) = packet else {
        panic!("expected a message");
    };
    assert_eq!(m.addr, "/pixli/motion/intensity");
    assert_eq!(m.args, vec![OscType::Float(42.0)]);
}
