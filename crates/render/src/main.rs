//! Generate a shadow monster from a room and write its mask and snapshots.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use shadow_kernel::geometry::point::Point3d;
use shadow_kernel::geometry::vector::Vec3;
use shadow_kernel::scene::shape::Shape;
use shadow_kernel::scene::{CanvasPlacement, ShadowLight};
use shadow_kernel::{Generation, MonsterPipeline, PipelineConfig, SceneConfig, set_tree_depth};
use shadow_render::{DEFAULT_SNAPSHOT_SIZE, SnapshotStyle, snapshot_mesh};
use shadow_tessellation::{TriangleMesh, mesh_from_parts, validate_mesh};

#[derive(Parser, Debug)]
#[command(name = "monster_demo", version, about = "Turn a room's shadow into an extruded monster")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the room, extract the silhouette and extrude it
    Generate {
        /// Scene JSON; defaults to the bedroom with a prop and a side light
        #[arg(long)]
        scene: Option<PathBuf>,
        /// Pipeline settings JSON; missing fields take their defaults
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        resolution: Option<u32>,
        /// Depths to snapshot, in order
        #[arg(long = "depth", default_values_t = [1.0, 5.0, 20.0])]
        depths: Vec<f64>,
        #[arg(long, default_value_t = DEFAULT_SNAPSHOT_SIZE)]
        snapshot_size: u32,
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,
    },
    /// Write the default demo scene as JSON
    DumpScene {
        #[arg(long, default_value = "scene.json")]
        out: PathBuf,
    },
}

/// The bedroom with a crate on the floor. The flashlight is lowered and moved to
/// the side so the crate's shadow lands on the back wall above the floor line.
fn demo_scene() -> SceneConfig {
    let prop = CanvasPlacement {
        position: (200.0, 180.0),
        rotation_degrees: 25.0,
        scale: 1.0,
    }
    .place_prop(
        "crate",
        Shape::Box {
            width: 1.0,
            height: 1.5,
            length: 1.0,
        },
    );
    SceneConfig::bedroom()
        .with_shadow_light(ShadowLight::spot(
            Point3d::new(5.0, 1.0, 8.0),
            Vec3::new(-0.4, 0.0, -1.0),
            60.0,
        ))
        .with_prop(prop)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn report(name: &str, mesh: &TriangleMesh) {
    let val = validate_mesh(mesh);
    let watertight = if val.is_watertight() { "watertight" } else { "open" };
    println!(
        "  {name}: {tris} tris, {verts} verts, {watertight}, vol={vol:.1}",
        tris = mesh.triangle_count(),
        verts = mesh.vertex_count(),
        vol = val.signed_volume,
    );
    if val.boundary_edges > 0 || val.non_manifold_edges > 0 {
        println!(
            "    boundary_edges={}, non_manifold={}",
            val.boundary_edges, val.non_manifold_edges
        );
    }
}

fn generate(
    scene: SceneConfig,
    mut config: PipelineConfig,
    resolution: Option<u32>,
    depths: &[f64],
    snapshot_size: u32,
    out_dir: &Path,
) -> Result<()> {
    if let Some(resolution) = resolution {
        config.resolution = resolution;
    }
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let pipeline = MonsterPipeline::new(config);
    let mask = pipeline.renderer().render(&scene, config.resolution)?;
    let mask_path = out_dir.join("mask.png");
    mask.as_image()
        .save(&mask_path)
        .with_context(|| format!("writing {}", mask_path.display()))?;
    println!("mask: {} ({}x{})", mask_path.display(), mask.width(), mask.height());

    let monster = match pipeline.generate_from_mask(&mask)? {
        Generation::Monster(monster) => monster,
        Generation::NoSilhouetteFound => bail!("the scene casts no shadow on the backdrop"),
    };
    println!(
        "monster: {} contour(s), {} part(s), body has {} points",
        monster.contour_count,
        monster.parts.len(),
        monster.body.polygon().len()
    );

    let style = SnapshotStyle {
        size: snapshot_size,
        ..SnapshotStyle::default()
    };
    for &depth in depths {
        set_tree_depth(&monster.parts, depth)?;
        let mesh = mesh_from_parts(&monster.parts);
        report(&format!("depth {depth}"), &mesh);
        let path = out_dir.join(format!("monster_d{depth}.png"));
        snapshot_mesh(&mesh, &style)
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    println!("snapshots written to {}", out_dir.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate {
            scene,
            config,
            resolution,
            depths,
            snapshot_size,
            out_dir,
        } => {
            let scene = match scene {
                Some(path) => read_json(&path)?,
                None => demo_scene(),
            };
            let config = match config {
                Some(path) => read_json(&path)?,
                None => PipelineConfig::default(),
            };
            generate(scene, config, resolution, &depths, snapshot_size, &out_dir)?;
        }
        Command::DumpScene { out } => {
            let json = serde_json::to_string_pretty(&demo_scene())?;
            fs::write(&out, json).with_context(|| format!("writing {}", out.display()))?;
            println!("scene written to {}", out.display());
        }
    }
    Ok(())
}
