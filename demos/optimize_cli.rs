//! Optimize a procedurally generated asset from the command line
//!
//! Builds a scene with a dense terrain patch, a raw (unwelded) cube and an
//! empty pivot node, loads it into an [`Asset`], optionally sizes it, and runs
//! one optimize pass. Set `RUST_LOG=debug` for per-stage logs.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use meshprep_algorithms::{WeldOptions, WELD_TOLERANCE};
use meshprep_core::{Axis, NodeTransform, Point3f, SceneNode, TriangleMesh, Vector3f};
use meshprep_pipeline::{Asset, OptimizeOptions, Orchestrator, TracingObserver};
use meshprep_simplification::Decimator;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UpAxis {
    X,
    Y,
    Z,
}

impl From<UpAxis> for Axis {
    fn from(value: UpAxis) -> Self {
        match value {
            UpAxis::X => Axis::X,
            UpAxis::Y => Axis::Y,
            UpAxis::Z => Axis::Z,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "optimize_cli", about = "Weld, ground, size and decimate a demo asset")]
struct Args {
    /// Vertices per side of the terrain patch
    #[arg(long, default_value_t = 200)]
    grid: usize,

    /// Triangle budget per mesh node
    #[arg(long)]
    max_triangles: Option<usize>,

    /// Split sharp edges before decimating, at this angle in degrees
    #[arg(long)]
    preserve_edges: Option<f32>,

    /// Run the coarse split after decimating, at this angle in degrees
    #[arg(long)]
    split: Option<f32>,

    /// Optimize options as camelCase JSON; overrides the flags above
    #[arg(long)]
    options_json: Option<String>,

    /// Distance below which vertices are welded together
    #[arg(long, default_value_t = WELD_TOLERANCE)]
    weld_tolerance: f32,

    /// Resize the asset so its width along X is this many millimetres
    #[arg(long)]
    width_mm: Option<f32>,

    #[arg(long, value_enum, default_value_t = UpAxis::Y)]
    up: UpAxis,
}

impl Args {
    fn optimize_options(&self) -> Result<OptimizeOptions> {
        if let Some(json) = &self.options_json {
            return OptimizeOptions::from_json(json).context("parsing --options-json");
        }
        let mut options = OptimizeOptions::new().flat_only();
        if let Some(max) = self.max_triangles {
            options = options.with_max_triangles(max);
        }
        if let Some(angle) = self.preserve_edges {
            options = options.with_preserve_edges(angle);
        }
        if let Some(angle) = self.split {
            options = options.with_coarse_split(angle);
        }
        options.validate()?;
        Ok(options)
    }
}

fn terrain(n: usize, size: f32) -> TriangleMesh {
    let n = n.max(2);
    let step = size / (n - 1) as f32;
    let mut vertices = Vec::with_capacity(n * n);
    for j in 0..n {
        for i in 0..n {
            let (x, z) = (i as f32 * step, j as f32 * step);
            let y = 4.0 + 3.0 * (x * 0.15).sin() * (z * 0.1).cos();
            vertices.push(Point3f::new(x, y, z));
        }
    }
    let mut faces = Vec::with_capacity((n - 1) * (n - 1) * 2);
    for j in 0..(n - 1) {
        for i in 0..(n - 1) {
            let a = j * n + i;
            faces.push([a, a + n, a + 1]);
            faces.push([a + 1, a + n, a + n + 1]);
        }
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

fn raw_cube(size: f32) -> TriangleMesh {
    let c = |x: f32, y: f32, z: f32| Point3f::new(x * size, y * size, z * size);
    let corners = [
        c(0.0, 0.0, 0.0),
        c(1.0, 0.0, 0.0),
        c(1.0, 1.0, 0.0),
        c(0.0, 1.0, 0.0),
        c(0.0, 0.0, 1.0),
        c(1.0, 0.0, 1.0),
        c(1.0, 1.0, 1.0),
        c(0.0, 1.0, 1.0),
    ];
    let faces = [
        [0, 2, 1], [0, 3, 2],
        [4, 5, 6], [4, 6, 7],
        [0, 1, 5], [0, 5, 4],
        [3, 6, 2], [3, 7, 6],
        [0, 4, 7], [0, 7, 3],
        [1, 2, 6], [1, 6, 5],
    ];
    TriangleMesh::from_raw(faces.iter().flatten().map(|&i| corners[i]).collect())
}

fn build_scene(grid: usize) -> SceneNode {
    SceneNode::new("demo")
        .with_child(SceneNode::with_geometry("terrain", terrain(grid, 100.0)))
        .with_child(
            SceneNode::new("pivot").with_child(
                SceneNode::with_geometry("cube", raw_cube(10.0))
                    .with_transform(NodeTransform::from_translation(Vector3f::new(110.0, 2.0, 0.0))),
            ),
        )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let options = args.optimize_options()?;

    let asset = Asset::new()
        .with_up_axis(args.up.into())
        .with_observer(Arc::new(TracingObserver));
    let grounding = asset.load(build_scene(args.grid))?;
    info!(scaled = ?grounding.scaled, "loaded demo asset");

    if let Some(width) = args.width_mm {
        let outcome = asset.fit_dimension(Axis::X, width)?;
        info!(scale = *outcome.value(), status = ?outcome.status(), "fitted width");
    }

    let weld = WeldOptions {
        tolerance: args.weld_tolerance,
    };
    let orchestrator = Orchestrator::new(Decimator::default().with_weld(weld), weld);
    let report = asset.optimize(&orchestrator, &options)?;

    for node in &report.nodes {
        println!(
            "{:<10} {:>8} -> {:>8} triangles",
            node.name, node.triangles_before, node.triangles_after
        );
        for stage in &node.stages {
            println!("    {:<14} {:?}", stage.stage.to_string(), stage.status);
        }
    }
    println!(
        "generation {}: {} -> {} triangles",
        report.generation,
        report.triangles_before(),
        report.triangles_after()
    );
    Ok(())
}
