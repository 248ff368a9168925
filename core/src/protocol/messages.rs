//! Wire message definitions
//!
//! Every datagram is UTF-8 text. Discovery messages are bare literals;
//! command and response messages are a literal prefix followed by an
//! encrypted envelope.

use super::constants::{COMMAND_PREFIX, DISCOVERY_PROBE, DISCOVERY_REPLY, RESPONSE_PREFIX};

/// All protocol messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolMessage {
    /// Parent looks for children on the broadcast domain
    DiscoveryProbe,

    /// Child announces itself in answer to a probe
    DiscoveryReply,

    /// Encrypted command envelope, parent to child
    Command(String),

    /// Encrypted response envelope, child to parent
    Response(String),
}

impl ProtocolMessage {
    /// Render the message as wire text
    pub fn encode(&self) -> String {
        match self {
            ProtocolMessage::DiscoveryProbe => DISCOVERY_PROBE.to_string(),
            ProtocolMessage::DiscoveryReply => DISCOVERY_REPLY.to_string(),
            ProtocolMessage::Command(envelope) => format!("{}{}", COMMAND_PREFIX, envelope),
            ProtocolMessage::Response(envelope) => format!("{}{}", RESPONSE_PREFIX, envelope),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode().into_bytes()
    }

    /// Parse wire text. Discovery literals must match exactly.
    pub fn parse(text: &str) -> Option<Self> {
        if text == DISCOVERY_PROBE {
            Some(ProtocolMessage::DiscoveryProbe)
        } else if text == DISCOVERY_REPLY {
            Some(ProtocolMessage::DiscoveryReply)
        } else if let Some(envelope) = text.strip_prefix(COMMAND_PREFIX) {
            Some(ProtocolMessage::Command(envelope.to_string()))
        } else {
            text.strip_prefix(RESPONSE_PREFIX)
                .map(|envelope| ProtocolMessage::Response(envelope.to_string()))
        }
    }

    /// Parse a raw datagram; non UTF-8 payloads are never protocol messages
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        std::str::from_utf8(bytes).ok().and_then(Self::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_literals() {
        assert_eq!(ProtocolMessage::DiscoveryProbe.encode(), "CST_PARENT_DISCOVERY");
        assert_eq!(ProtocolMessage::DiscoveryReply.encode(), "CST_CHILD_RESPONSE");
        assert_eq!(ProtocolMessage::Command("abc=".into()).encode(), "CST_CMD:abc=");
        assert_eq!(ProtocolMessage::Response("xyz=".into()).encode(), "CST_RESP:xyz=");
    }

    #[test]
    fn test_parse_known_shapes() {
        assert_eq!(
            ProtocolMessage::parse("CST_CHILD_RESPONSE"),
            Some(ProtocolMessage::DiscoveryReply)
        );
        assert_eq!(
            ProtocolMessage::parse("CST_RESP:Zm9v"),
            Some(ProtocolMessage::Response("Zm9v".to_string()))
        );
        assert_eq!(
            ProtocolMessage::parse("CST_CMD:"),
            Some(ProtocolMessage::Command(String::new()))
        );
    }

    #[test]
    fn test_discovery_reply_must_be_exact() {
        assert_eq!(ProtocolMessage::parse("CST_CHILD_RESPONSE "), None);
        assert_eq!(ProtocolMessage::parse("cst_child_response"), None);
        assert_eq!(ProtocolMessage::parse("CST_CHILD_RESPONSEX"), None);
    }

    #[test]
    fn test_noise_is_rejected() {
        assert_eq!(ProtocolMessage::parse("hello"), None);
        assert_eq!(ProtocolMessage::from_bytes(&[0xff, 0xfe, 0x00]), None);
    }
}
