use std::time::Instant;

use linkprims_frame::{write_all, FrameExtractor, FrameWriter, RemainderPolicy};
use linkprims_reader::{LinkReader, StopReason, WorkerExit};
use tracing::{debug, info, warn};

use crate::cmd::{open_link, parse_duration, test_payload, ProbeArgs};
use crate::exit::{frame_error, link_error, reader_error, CliResult, SUCCESS, TIMEOUT};
use crate::output::{millis, print_collected, print_extraction, print_probe, OutputFormat, ProbeReport};

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let request = args.collect.request()?;
    let deadline = parse_duration(&args.deadline)?;
    let stop_timeout = parse_duration(&args.stop_timeout)?;

    let link = open_link(&args.link)?;
    let name = link.name().to_string();
    let mut reader =
        LinkReader::spawn(link.clone()).map_err(|err| reader_error("reader start failed", err))?;

    let (payload, last_segment) = test_payload(args.length);
    let mut extractor = args.slip.then(|| {
        FrameExtractor::new(if args.carry_over {
            RemainderPolicy::CarryOver
        } else {
            RemainderPolicy::Drop
        })
    });

    let t0 = Instant::now();
    let written = if args.slip {
        FrameWriter::new()
            .send(link.as_ref(), &payload)
            .map_err(|err| frame_error("write failed", err))?
    } else {
        write_all(link.as_ref(), &payload).map_err(|err| frame_error("write failed", err))?;
        payload.len()
    };
    let t1 = Instant::now();
    info!(link = %name, written, slip = args.slip, "probe payload written");

    let mut echoed = Vec::with_capacity(payload.len());
    let mut received = 0usize;
    let mut frames = 0usize;
    let mut malformed = 0usize;
    let mut echo_complete = false;
    let mut t2;

    loop {
        let collected = reader
            .collect(&request)
            .map_err(|err| reader_error("collect failed", err))?;
        t2 = Instant::now();

        if !collected.is_empty() {
            received += collected.len();
            print_collected(&name, &collected, format);

            match extractor.as_mut() {
                Some(extractor) => {
                    let extraction = extractor.push(&collected.bytes);
                    print_extraction(&name, &extraction, format);
                    frames += extraction.frames.len();
                    malformed += extraction.malformed.len();
                    for payload in extraction.payloads() {
                        echoed.extend_from_slice(payload);
                    }
                }
                None => echoed.extend_from_slice(&collected.bytes),
            }

            if contains(&echoed, last_segment.as_bytes()) {
                debug!(segment = %last_segment, "final payload segment seen");
                echo_complete = true;
                break;
            }
        }

        if collected.reason == StopReason::WorkerStopped {
            warn!(link = %name, "reader stopped before the echo completed");
            break;
        }
        if t2.duration_since(t1) > deadline {
            break;
        }
    }

    reader.request_stop();
    let t3 = Instant::now();
    let stop_confirmed = reader.wait_stopped(stop_timeout);
    let t4 = Instant::now();

    if stop_confirmed {
        match reader.shutdown() {
            Ok(WorkerExit::Failed(err)) => return Err(link_error("link read failed", err)),
            Ok(exit) => debug!(?exit, "reader joined"),
            Err(err) => warn!(error = %err, "reader join failed"),
        }
    }
    link.close();

    let finish = t2.duration_since(t0);
    let report = ProbeReport {
        link: name,
        written,
        received,
        frames,
        malformed,
        echo_complete,
        write_ms: millis(t1.duration_since(t0)),
        finish_ms: millis(finish),
        bytes_per_sec: rate(received, finish.as_secs_f64()),
        stop_wait_ms: millis(t4.duration_since(t3)),
        stop_confirmed,
    };
    print_probe(&report, format);

    Ok(if echo_complete { SUCCESS } else { TIMEOUT })
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

fn rate(bytes: usize, secs: f64) -> f64 {
    if secs > 0.0 {
        bytes as f64 / secs
    } else {
        0.0
    }
}
