use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("linkprims {}", env!("CARGO_PKG_VERSION"));
    if args.extended {
        println!("target: {}-{}", std::env::consts::ARCH, std::env::consts::OS);
        println!(
            "features: serial={}, async={}",
            cfg!(feature = "serial"),
            cfg!(feature = "async")
        );
        println!("reader chunk size: {}", linkprims_reader::DEFAULT_CHUNK_SIZE);
        println!("frame max carry: {}", linkprims_frame::DEFAULT_MAX_CARRY);
    }
    Ok(SUCCESS)
}
