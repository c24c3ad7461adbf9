use std::time::Duration;

use super::*;
use crate::state::palette::BuiltinPalettes;

#[test]
fn artdmx_header_layout() {
    let mut frame = DmxFrame::new(0x0102);
    frame.set(1, 0xAA);
    frame.set(512, 0xBB);
    let packet = encode_artdmx(&frame, 7);
    assert_eq!(packet.len(), 18 + 512);
    assert_eq!(&packet[0..8], b"Art-Net\0");
    assert_eq!(&packet[8..10], &[0x00, 0x50]);
    assert_eq!(&packet[10..12], &[0, 14]);
    assert_eq!(packet[12], 7);
    assert_eq!(&packet[14..16], &[0x02, 0x01]);
    assert_eq!(&packet[16..18], &[0x02, 0x00]);
    assert_eq!(packet[18], 0xAA);
    assert_eq!(packet[18 + 511], 0xBB);
}

#[test]
fn out_of_range_channels_are_ignored() {
    let mut frame = DmxFrame::new(0);
    frame.set(0, 1);
    frame.set(513, 1);
    assert!(frame.channels.iter().all(|&c| c == 0));
    assert_eq!(frame.channel(0), 0);
    assert_eq!(frame.channel(600), 0);
}

#[test]
fn state_maps_onto_fixed_channels() {
    let palettes = BuiltinPalettes::new().unwrap();
    let palette = palettes.first().clone();
    let mut state = GeneratorState::default();
    state.motion_intensity = 100.0;
    state.motion_speed = 0.0;
    state.background_brightness = 50.0;
    state.hue_rotation_speed = 0.0;
    state.hue_shift = 0.0;

    let frame = frame_from_state(&state, &palette, 3, 10.0);
    assert_eq!(frame.universe, 3);
    let first = palette.colors[0];
    assert_eq!([frame.channel(1), frame.channel(2), frame.channel(3)], [first.r, first.g, first.b]);
    assert_eq!(frame.channel(CHANNEL_INTENSITY), 255);
    assert_eq!(frame.channel(CHANNEL_SPEED), 0);
    assert_eq!(frame.channel(CHANNEL_BACKGROUND), 128);
    assert_eq!(frame.channel(CHANNEL_BACKGROUND + 1), 0);
}

#[tokio::test]
async fn sends_packets_with_advancing_sequence() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mut dmx = DmxAdapter::new(DmxSettings {
        enabled: true,
        target: receiver.local_addr().unwrap(),
        universe: 1,
    });
    let frame = DmxFrame::new(1);
    assert!(dmx.send_frame(&frame).await.is_err());

    dmx.connect().await.unwrap();
    assert_eq!(dmx.connection_state(), ConnectionState::Connected);
    dmx.send_frame(&frame).await.unwrap();
    dmx.send_frame(&frame).await.unwrap();

    let mut buf = [0u8; 1024];
    let mut sequences = Vec::new();
    for _ in 0..2 {
        let (n, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 530);
        sequences.push(buf[12]);
    }
    assert_eq!(sequences, vec![1, 2]);

    dmx.disconnect();
    dmx.disconnect();
    assert_eq!(dmx.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn disabled_output_refuses_to_connect() {
    let mut dmx = DmxAdapter::new(DmxSettings::default());
    assert!(dmx.connect().await.is_err());
}

#[test]
fn sequence_skips_zero_on_wrap() {
    assert_eq!(next_sequence(0), 1);
    assert_eq!(next_sequence(254), 255);
    assert_eq!(next_sequence(255), 1);
}
