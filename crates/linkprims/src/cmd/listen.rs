use std::time::Instant;

use linkprims_frame::{FrameExtractor, RemainderPolicy};
use linkprims_reader::{CancellationToken, LinkReader, StopReason, WorkerExit};
use tracing::{debug, info};

use crate::cmd::{open_link, parse_duration, ListenArgs};
use crate::exit::{link_error, reader_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_collected, print_extraction, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let request = args.collect.request()?;
    let limit = args.duration.as_deref().map(parse_duration).transpose()?;

    let link = open_link(&args.link)?;
    let name = link.name().to_string();
    let mut reader =
        LinkReader::spawn(link.clone()).map_err(|err| reader_error("reader start failed", err))?;
    install_ctrlc_handler(reader.stop_token())?;

    let mut extractor = args.slip.then(|| {
        FrameExtractor::new(if args.carry_over {
            RemainderPolicy::CarryOver
        } else {
            RemainderPolicy::Drop
        })
    });

    info!(link = %name, "listening");
    let started = Instant::now();
    let stop = reader.stop_token();
    let mut printed = 0usize;

    while !stop.is_cancelled() {
        let collected = reader
            .collect(&request)
            .map_err(|err| reader_error("collect failed", err))?;

        if !collected.is_empty() {
            match extractor.as_mut() {
                Some(extractor) => {
                    print_extraction(&name, &extractor.push(&collected.bytes), format)
                }
                None => print_collected(&name, &collected, format),
            }
            printed = printed.saturating_add(1);
        }

        if collected.reason == StopReason::WorkerStopped {
            break;
        }
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
    }

    let exit = reader
        .shutdown()
        .map_err(|err| reader_error("reader shutdown failed", err))?;
    link.close();
    debug!(?exit, printed, "listen finished");

    match exit {
        WorkerExit::Failed(err) => Err(link_error("link read failed", err)),
        WorkerExit::StopRequested | WorkerExit::LinkClosed => Ok(SUCCESS),
    }
}

fn install_ctrlc_handler(stop: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || stop.cancel())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
