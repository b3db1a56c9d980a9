use crate::proto::command::Command;
use bytes::BytesMut;
use std::{
    fmt::{self, Write},
    io::{self},
};
use tokio_util::codec::{Decoder, Encoder};

const EOL: u8 = b'\n';
const MAX_LINE_LEN: usize = 256;

/// Line codec for the SynthHD command set.
///
/// Commands go out as ASCII followed by `\n`, replies come back one per line.
#[derive(Default)]
pub struct ProtocolCodec;

impl Decoder for ProtocolCodec {
    type Item = String;
    // Deciding whether a line is a valid reply to the last query is up to
    // the device layer, so only framing errors are reported here.
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.iter().position(|b| *b == EOL) {
            Some(n) => {
                let line = src.split_to(n + 1);
                let text = std::str::from_utf8(&line[..n])
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Some(text.trim_end_matches('\r').to_string()))
            }
            None if src.len() > MAX_LINE_LEN => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Reply line exceeds {} bytes", MAX_LINE_LEN),
            )),
            None => Ok(None),
        }
    }
}

fn write_fmt_guarded(dst: &mut BytesMut, args: fmt::Arguments<'_>) -> Result<(), io::Error> {
    dst.write_fmt(args)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

impl Encoder<Command> for ProtocolCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_fmt_guarded(dst, format_args!("{}\n", item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_waits_for_eol() {
        let mut codec = ProtocolCodec::default();
        let mut buf = BytesMut::from(&b"1000.00"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"00000\r\n-10");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("1000.0000000".to_string())
        );
        assert_eq!(&buf[..], b"-10");
    }

    #[test]
    fn test_decode_rejects_runaway_line() {
        let mut codec = ProtocolCodec::default();
        let mut buf = BytesMut::from(&[b'9'; MAX_LINE_LEN + 1][..]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn test_encode_appends_eol() {
        let mut codec = ProtocolCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(Command::SetPower(3.0), &mut buf).unwrap();
        assert_eq!(&buf[..], b"W3.000\n");
    }
}
