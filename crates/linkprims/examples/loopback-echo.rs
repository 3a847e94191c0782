//! Echo a SLIP frame over an in-memory link and decode what comes back.
//!
//! Run: cargo run -p linkprims --example loopback-echo

use std::sync::Arc;
use std::time::Duration;

use linkprims::frame::{FrameExtractor, FrameWriter, RemainderPolicy};
use linkprims::link::{Link, LoopbackConfig, LoopbackLink};
use linkprims::reader::{CollectRequest, LinkReader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let link = Arc::new(LoopbackLink::with_config(
        "loopback",
        LoopbackConfig {
            max_read: Some(4),
            ..LoopbackConfig::default()
        },
    ));
    let mut reader = LinkReader::spawn(link.clone())?;

    let written = FrameWriter::new().send(link.as_ref(), b"hello device\n")?;
    println!("wrote {written} bytes");

    let request = CollectRequest::default().with_timeout(Duration::from_millis(200));
    let collected = reader.collect(&request)?;
    println!(
        "collected {} bytes ({}) in {:?}",
        collected.len(),
        collected.reason,
        collected.elapsed
    );

    let mut extractor = FrameExtractor::new(RemainderPolicy::Drop);
    for payload in extractor.push(&collected.bytes).payloads() {
        println!("decoded: {}", payload.escape_ascii());
    }

    let exit = reader.shutdown()?;
    println!("reader exited: {exit:?}");
    link.close();
    Ok(())
}
