//! Show media metadata.

use clipline_common::clock::format_timecode;
use clipline_render_engine::FfprobeProbe;

pub fn run(source: &str) -> anyhow::Result<()> {
    let info = FfprobeProbe::new()
        .probe(source)
        .map_err(|e| anyhow::anyhow!("Failed to probe {source}: {e}"))?;

    println!("Source: {source}");
    match info.duration {
        Some(secs) if secs.is_finite() => {
            println!("  Duration: {} ({secs:.3}s)", format_timecode(secs))
        }
        _ => println!("  Duration: unknown"),
    }
    if info.has_video() {
        println!("  Video: {}x{} @ {:.2}fps", info.width, info.height, info.fps);
    } else {
        println!("  Video: none");
    }
    println!("  Audio: {}", if info.has_audio { "yes" } else { "no" });
    Ok(())
}
