//! motion-sampler CLI - Inspect keyframed scenes and sample mesh velocities.

use std::env;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use motion_sampler::geom::{FaceView, OutputMesh, PolyFaces, TriFaces};
use motion_sampler::prelude::*;
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "MOTION_SAMPLER_LOG";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Debug,
    Trace,
}

impl Verbosity {
    fn directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Debug => "motion_sampler=debug,info",
            Verbosity::Trace => "motion_sampler=trace,debug",
        }
    }
}

fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    // Global flags
    let mut verbosity = Verbosity::Normal;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args {
        match arg.as_str() {
            "-v" | "--verbose" => verbosity = Verbosity::Debug,
            "-vv" | "--trace" => verbosity = Verbosity::Trace,
            "-q" | "--quiet" => verbosity = Verbosity::Quiet,
            _ => filtered_args.push(arg),
        }
    }

    if filtered_args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    // JSON output must stay machine readable
    if filtered_args.contains(&"--json") && verbosity == Verbosity::Normal {
        verbosity = Verbosity::Quiet;
    }
    init_logging(verbosity);

    let result = match filtered_args[0] {
        "info" | "i" => match filtered_args.get(1) {
            Some(path) => cmd_info(path),
            None => Err(anyhow!("missing scene argument\nUsage: motion-sampler info <scene.json>")),
        },
        "sample" | "s" => SampleArgs::parse(&filtered_args[1..]).and_then(|a| cmd_sample(&a)),
        "version" | "-V" | "--version" => {
            println!(
                "motion-sampler {} (built {})",
                env!("CARGO_PKG_VERSION"),
                env!("MOTION_SAMPLER_BUILD_DATE")
            );
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_help();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("motion-sampler - Velocity sampling for animated meshes");
    println!();
    println!("USAGE:");
    println!("    motion-sampler [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info    <scene>              List objects and their keys");
    println!("    s, sample  <scene> [object]     Sample velocities (all objects if none given)");
    println!("    version                         Show version and build date");
    println!("    h, help                         Show this help");
    println!();
    println!("SAMPLE OPTIONS:");
    println!("    --start <tick>         Start tick (default 0)");
    println!("    --end <tick>           End tick (default: start)");
    println!("    --scale <s>            Search step scale in (0, 1)");
    println!("    --iterations <n>       Cap on forward search candidates");
    println!("    --ignore-empty         Return empty meshes instead of failing");
    println!("    --ignore-topology      Drop velocity instead of failing on topology changes");
    println!("    --object-space         Skip object transforms");
    println!("    --poly                 Keep polygon faces (default: triangles)");
    println!("    --json                 Print JSON");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose          Debug output");
    println!("    -vv, --trace           Trace output");
    println!("    -q, --quiet            Errors only");
    println!();
    println!("Ticks run at {TICKS_PER_SECOND} per second. {LOG_ENV} overrides the log filter.");
}

// ============================================================================
// info
// ============================================================================

fn cmd_info(path: &str) -> anyhow::Result<()> {
    let source = KeyframeSource::load(path).with_context(|| format!("loading {path}"))?;

    println!("Scene: {path}");
    println!("Objects: {}", source.len());
    if let Some(policy) = source.policy() {
        println!(
            "Policy: scale={} iterations={} ignore_empty={} ignore_topology={} object_space={}",
            policy.time_step_scale,
            policy
                .max_search_iterations
                .map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
            policy.ignore_empty_meshes,
            policy.ignore_topology_mismatch,
            policy.use_object_space,
        );
    }
    println!();

    for name in source.names() {
        let Some(track) = source.object(name) else { continue };
        let kind = if track.is_triangulated() { "triangles" } else { "polygons" };
        let range = match (track.mesh_keys.first(), track.mesh_keys.last()) {
            (Some(a), Some(b)) => format!("[{}, {}]", a.time, b.time),
            _ => "-".to_string(),
        };
        println!(
            "  {name:<24} {kind:<10} mesh keys: {:<4} xform keys: {:<4} {:?} {range}",
            track.mesh_keys.len(),
            track.transform_keys.len(),
            track.interpolation,
        );
    }
    Ok(())
}

// ============================================================================
// sample
// ============================================================================

struct SampleArgs {
    scene: String,
    object: Option<String>,
    start: Tick,
    end: Option<Tick>,
    scale: Option<f64>,
    iterations: Option<u32>,
    ignore_empty: bool,
    ignore_topology: bool,
    object_space: bool,
    poly: bool,
    json: bool,
}

impl SampleArgs {
    fn parse(args: &[&str]) -> anyhow::Result<Self> {
        let mut positional = Vec::new();
        let mut out = SampleArgs {
            scene: String::new(),
            object: None,
            start: 0,
            end: None,
            scale: None,
            iterations: None,
            ignore_empty: false,
            ignore_topology: false,
            object_space: false,
            poly: false,
            json: false,
        };

        let mut iter = args.iter().copied();
        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| {
                iter.next()
                    .ok_or_else(|| anyhow!("{flag} needs a value"))
            };
            match arg {
                "--start" => out.start = value(arg)?.parse().context("--start")?,
                "--end" => out.end = Some(value(arg)?.parse().context("--end")?),
                "--scale" => out.scale = Some(value(arg)?.parse().context("--scale")?),
                "--iterations" => out.iterations = Some(value(arg)?.parse().context("--iterations")?),
                "--ignore-empty" => out.ignore_empty = true,
                "--ignore-topology" => out.ignore_topology = true,
                "--object-space" => out.object_space = true,
                "--poly" => out.poly = true,
                "--json" | "-j" => out.json = true,
                flag if flag.starts_with("--") => bail!("unknown option {flag}"),
                _ => positional.push(arg),
            }
        }

        match positional.as_slice() {
            [] => bail!("missing scene argument\nUsage: motion-sampler sample <scene.json> [object]"),
            [scene] => out.scene = scene.to_string(),
            [scene, object] => {
                out.scene = scene.to_string();
                out.object = Some(object.to_string());
            }
            [_, _, extra, ..] => bail!("unexpected argument {extra}"),
        }
        Ok(out)
    }

    /// Scene policy (or the default) with command line overrides applied.
    fn policy(&self, scene: Option<&SamplingPolicy>) -> SamplingPolicy {
        let mut policy = scene.cloned().unwrap_or_default();
        if let Some(scale) = self.scale {
            policy.time_step_scale = scale;
        }
        if let Some(iterations) = self.iterations {
            policy.max_search_iterations = Some(iterations);
        }
        policy.ignore_empty_meshes |= self.ignore_empty;
        policy.ignore_topology_mismatch |= self.ignore_topology;
        policy.use_object_space |= self.object_space;
        policy
    }
}

fn cmd_sample(args: &SampleArgs) -> anyhow::Result<()> {
    let source = KeyframeSource::load(&args.scene).with_context(|| format!("loading {}", args.scene))?;
    let policy = args.policy(source.policy());
    policy.validate()?;

    let handles: Vec<String> = match &args.object {
        Some(name) => vec![name.clone()],
        None => source.names().map(str::to_string).collect(),
    };
    let start = args.start;
    let end = args.end.unwrap_or(start);
    info!(objects = handles.len(), start, end, "sampling");

    let sampler = VelocitySampler::new(policy);
    let rows = if args.poly {
        let cached = CachedSource::<_, PolyFaces>::new(&source);
        let rows = collect_rows(&handles, sampler.sample_batch(&cached, &handles, start, end));
        debug!(stats = ?cached.stats(), "cache");
        rows
    } else {
        let cached = CachedSource::<_, TriFaces>::new(&source);
        let rows = collect_rows(&handles, sampler.sample_batch(&cached, &handles, start, end));
        debug!(stats = ?cached.stats(), "cache");
        rows
    };

    let failures = rows.iter().filter(|r| r.error.is_some()).count();
    if args.json {
        let doc = json!({
            "start": start,
            "end": end,
            "ticks_per_second": TICKS_PER_SECOND,
            "objects": rows.iter().map(Row::to_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        for row in &rows {
            row.print();
        }
    }

    if failures > 0 {
        bail!("{failures} of {} objects failed", rows.len());
    }
    Ok(())
}

/// Printable summary of one sampled object.
struct Row {
    name: String,
    error: Option<String>,
    vertices: usize,
    faces: usize,
    validity: Option<ValidityInterval>,
    max_speed: Option<f32>,
    bounds: BBox3f,
    positions: Vec<f32>,
    velocities: Option<Vec<f32>>,
}

fn collect_rows<F: FaceView>(handles: &[String], results: Vec<Result<Sampled<F>>>) -> Vec<Row> {
    handles
        .iter()
        .zip(results)
        .map(|(name, result)| match result {
            Ok((mesh, validity)) => Row::from_mesh(name, &mesh, validity),
            Err(e) => Row {
                name: name.clone(),
                error: Some(e.to_string()),
                vertices: 0,
                faces: 0,
                validity: None,
                max_speed: None,
                bounds: BBox3f::EMPTY,
                positions: Vec::new(),
                velocities: None,
            },
        })
        .collect()
}

impl Row {
    fn from_mesh<F: FaceView>(name: &str, mesh: &OutputMesh<F>, validity: ValidityInterval) -> Self {
        Row {
            name: name.to_string(),
            error: None,
            vertices: mesh.vertex_count(),
            faces: mesh.face_count(),
            validity: Some(validity),
            max_speed: mesh.has_velocities().then(|| mesh.max_speed()),
            bounds: mesh.bounds(),
            positions: mesh.positions_flat().to_vec(),
            velocities: mesh.velocities_flat().map(<[f32]>::to_vec),
        }
    }

    fn print(&self) {
        if let Some(error) = &self.error {
            println!("{:<24} ERROR {error}", self.name);
            return;
        }
        let validity = self.validity.map(|v| v.to_string()).unwrap_or_default();
        let speed = match self.max_speed {
            Some(s) => format!("max speed {s:.4}/s"),
            None => "no velocity".to_string(),
        };
        println!(
            "{:<24} verts: {:<6} faces: {:<6} valid: {validity:<24} {speed}",
            self.name, self.vertices, self.faces
        );
        if !self.bounds.is_empty() {
            println!("{:<24} bounds: {:?}", "", self.bounds);
        }
    }

    fn to_json(&self) -> serde_json::Value {
        if let Some(error) = &self.error {
            return json!({ "name": self.name, "error": error });
        }
        json!({
            "name": self.name,
            "vertices": self.vertices,
            "faces": self.faces,
            "validity": self.validity.map(|v| [v.start(), v.end()]),
            "max_speed": self.max_speed,
            "positions": self.positions,
            "velocities": self.velocities,
        })
    }
}
