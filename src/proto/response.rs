use serde::Serialize;

use super::command::Command;
use super::ProtoError;
use crate::proto::Result;

/// Identity of the connected synthesizer, read once when the device is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ident {
    pub model: String,
    pub serial: String,
    pub hardware: String,
    pub firmware: String,
}

fn protocol_error(command: &Command, reply: &str) -> ProtoError {
    ProtoError::Protocol {
        command: command.to_string(),
        reply: reply.to_string(),
    }
}

/// Parse a numeric reply such as `1000.0000000` or `-10.000`.
pub fn parse_number(command: &Command, reply: &str) -> Result<f64> {
    reply
        .trim()
        .parse::<f64>()
        .map_err(|_| protocol_error(command, reply))
}

/// Parse a `0`/`1` reply.
pub fn parse_flag(command: &Command, reply: &str) -> Result<bool> {
    match reply.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(protocol_error(command, reply)),
    }
}

/// Version and identity strings are free text, but an empty line means the
/// device did not understand the query.
pub fn parse_text(command: &Command, reply: &str) -> Result<String> {
    let text = reply.trim();
    if text.is_empty() {
        Err(protocol_error(command, reply))
    } else {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(&Command::Power, " -10.500 ").unwrap(), -10.5);
        assert!(matches!(
            parse_number(&Command::Power, "ERR"),
            Err(ProtoError::Protocol { .. })
        ));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(&Command::RunState, "1").unwrap());
        assert!(!parse_flag(&Command::RunState, "0").unwrap());
        assert!(parse_flag(&Command::RunState, "2").is_err());
    }

    #[test]
    fn test_parse_text_rejects_empty() {
        assert_eq!(
            parse_text(&Command::Model, "SynthHD PRO\r").unwrap(),
            "SynthHD PRO"
        );
        assert!(parse_text(&Command::Model, "  ").is_err());
    }
}
