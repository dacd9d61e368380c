//! Terrain fly-through demo — streams chunks along a diagonal pass over
//! the generated terrain and reports what the manager did.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   JSON configuration file (default: built-in config)
//!   --seed <SEED>     Override the heightmap random seed
//!   --ticks <N>       Number of viewer ticks to simulate (default: 120)

use glam::Vec3;

use terrastream::config::TerrainConfig;
use terrastream::core::{Result, logging};
use terrastream::streaming::ChunkManager;

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = parse_str_arg(&args, "--config");
    let seed = parse_u64_arg(&args, "--seed");
    let ticks = parse_u64_arg(&args, "--ticks").unwrap_or(120).max(2);

    let result = load_config(config_path.as_deref(), seed).and_then(|config| run(config, ticks));
    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&str>, seed: Option<u64>) -> Result<TerrainConfig> {
    let mut config = match path {
        Some(path) => TerrainConfig::from_json_file(path)?,
        None => TerrainConfig::default(),
    };
    if let Some(seed) = seed {
        config.heightmap.random_seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn run(config: TerrainConfig, ticks: u64) -> Result<()> {
    let width = config.mesh.terrain_width;
    let altitude = config.mesh.max_height + 10.0;
    let mut manager = ChunkManager::new(config)?;

    println!("=== Terrastream fly-through ===");
    println!(
        "Terrain: {}m x {}m, {} chunk grid, {} LOD levels",
        width,
        width,
        manager.config().max_chunk_coord(),
        manager.config().mesh.levels_of_detail,
    );

    let mut total_created = 0;
    let mut total_rebuilt = 0;
    let mut total_evicted = 0;
    for tick in 0..ticks {
        // Diagonal pass from one terrain corner to the other.
        let t = tick as f32 / (ticks - 1) as f32;
        let viewer = Vec3::new(t * width, altitude, t * width);

        let stats = manager.update(viewer)?;
        total_created += stats.created;
        total_rebuilt += stats.rebuilt;
        total_evicted += stats.evicted;
        if !stats.is_idle() {
            log::info!(
                "tick {tick}: {} created, {} rebuilt, {} evicted",
                stats.created,
                stats.rebuilt,
                stats.evicted,
            );
        }
    }

    let vertices: usize = manager.chunks().map(|c| c.mesh.vertex_count()).sum();
    let triangles: usize = manager.chunks().map(|c| c.mesh.triangle_count()).sum();
    println!();
    println!(
        "Ticks: {ticks}, created {total_created}, rebuilt {total_rebuilt}, evicted {total_evicted}"
    );
    println!(
        "Resident: {} chunks, {} vertices, {} triangles",
        manager.loaded_count(),
        vertices,
        triangles,
    );
    Ok(())
}

fn parse_str_arg(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_u64_arg(args: &[String], name: &str) -> Option<u64> {
    parse_str_arg(args, name).and_then(|v| v.parse().ok())
}
