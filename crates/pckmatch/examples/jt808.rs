//! Decode JT/T 808 terminal messages from a byte stream and answer them.
//!
//! Run with:
//!   cargo run --example jt808
//!
//! The same decoding from the command line:
//!   cargo run --features cli -- match --layout crates/pckmatch/layouts/jt808.json dump.bin

use std::io::Cursor;

use pckmatch::convert::{Escaper, Record};
use pckmatch::field::REST;
use pckmatch::split::{FrameScanner, Framing};

const DELIMITER: u8 = 0x7e;

/// Two authentication messages with line noise in between.
const CAPTURE: &str = concat!(
    "7E01020006014530399195003F717361757468597E",
    "0000",
    "7E010200060145303991950040717361757468597E"
);

fn message_layout() -> pckmatch::convert::Result<Record> {
    let mut record = Record::new();
    record.add_hex_field("code", 2)?;
    record.add_uint_field("props", 2, false)?;
    record.add_hex_field("mobile", 6)?;
    record.add_uint_field("msgno", 2, false)?;
    record.add_byte_field("check", true)?;
    Ok(record)
}

fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |acc, b| acc ^ b)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let wire = hex::decode(CAPTURE)?;
    let framing = Framing::same_token(vec![DELIMITER])?;
    let escaper = Escaper::jt808();
    let mut request = message_layout()?;
    let mut reply = message_layout()?;

    for frame in FrameScanner::new(Cursor::new(wire), &framing) {
        let frame = frame?;
        let body = escaper.unwrap_frame(&frame, &[DELIMITER], &[DELIMITER]);
        request.decode(&body)?;

        let mobile = request.get_str("mobile")?.to_owned();
        let msgno = request.get_u64("msgno")?;
        println!(
            "code={} mobile={} msgno={} body={:?}",
            request.get_str("code")?,
            mobile,
            msgno,
            String::from_utf8_lossy(request.get_bytes(REST)?)
        );

        // platform general response: echo msgno and code, result 0
        let mut answer = Vec::with_capacity(5);
        answer.extend_from_slice(&(msgno as u16).to_be_bytes());
        answer.extend_from_slice(&hex::decode(request.get_str("code")?)?);
        answer.push(0);

        reply.clear();
        reply.set("code", "8001")?;
        reply.set("props", answer.len() as u16)?;
        reply.set("mobile", mobile.as_str())?;
        reply.set("msgno", msgno + 1)?;
        reply.set(REST, answer)?;
        let unsigned = reply.encode()?;
        reply.set("check", checksum(&unsigned[..unsigned.len() - 1]))?;

        let out = escaper.wrap_frame(&reply.encode()?, &[DELIMITER], &[DELIMITER]);
        println!("  reply {}", hex::encode_upper(&out));
    }

    Ok(())
}
