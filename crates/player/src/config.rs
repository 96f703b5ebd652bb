use anyhow::{Context, Result, bail};
use splatstream::StreamingConfig;

use crate::Args;

pub fn build(args: &Args) -> Result<StreamingConfig> {
    let mut config = match &args.config {
        Some(path) => StreamingConfig::from_json_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            let (Some(url), Some(max_frame), Some(slice_num), Some(total_cap), Some(fps)) = (
                args.url.clone(),
                args.max_frame,
                args.slice_num,
                args.total_cap,
                args.fps,
            ) else {
                bail!("without --config, --url --max-frame --slice-num --total-cap and --fps are required");
            };
            StreamingConfig::new(url, max_frame, slice_num, total_cap, fps)
        }
    };

    if let Some(url) = &args.url {
        config.model_url = url.clone();
    }
    if let Some(max_frame) = args.max_frame {
        config.max_frame = max_frame;
    }
    if let Some(slice_num) = args.slice_num {
        config.slice_num = slice_num;
    }
    if let Some(total_cap) = args.total_cap {
        config.total_cap = total_cap;
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(gop_size) = args.gop_size {
        config.gop_size = gop_size;
    }
    if args.no_compression {
        config.compression_enabled = false;
    }

    config.validate()?;
    Ok(config)
}
