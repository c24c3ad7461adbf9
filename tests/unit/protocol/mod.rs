use super::*;

#[test]
fn parse_error_display_names_protocol() {
    let err = ProtocolParseError::new("osc", "unknown address /x");
    assert_eq!(err.to_string(), "malformed osc message: unknown address /x");
    let wrapped: crate::foundation::error::PixliError = err.into();
    assert!(wrapped.to_string().starts_with("protocol error: malformed osc"));
}

#[test]
fn only_connected_counts_as_connected() {
    assert!(ConnectionState::Connected.is_connected());
    assert!(!ConnectionState::Reconnecting { attempt: 1 }.is_connected());
    assert!(!ConnectionState::GaveUp.is_connected());
}
