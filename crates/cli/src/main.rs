use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::{DMatrix, DVector};
use roucone::api::{ConeRou, Density, Hat, HatCfg, MultiNormal, StdNormal};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use tracing_subscriber::fmt::SubscriberBuilder;

mod provenance;

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Cone-based ratio-of-uniforms sampler")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DensityKind {
    /// Standard normal in R^dim
    Normal,
    /// Zero-mean normal with unit variances and common correlation `rho`
    Correlated,
}

/// Target density and hat parameters shared by `sample` and `hat`.
#[derive(clap::Args, Clone, Debug)]
struct TargetArgs {
    #[arg(long, value_enum, default_value_t = DensityKind::Normal)]
    density: DensityKind,
    #[arg(long, default_value_t = 2)]
    dim: usize,
    #[arg(long, default_value_t = 0.0)]
    rho: f64,
    #[arg(long, default_value_t = 100)]
    max_cones: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Check every accepted point against its cone's plane
    #[arg(long)]
    verify: bool,
}

#[derive(Subcommand)]
enum Action {
    /// Draw samples and write them (plus a hat summary) as JSON
    Sample {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long, default_value_t = 1000)]
        count: usize,
        #[arg(long)]
        out: String,
    },
    /// Build the hat and print its summary as JSON
    Hat {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Print a small provenance JSON block
    Report,
}

/// Densities selectable from the command line.
#[derive(Debug)]
enum Target {
    Normal(StdNormal),
    Correlated(MultiNormal),
}

impl Target {
    fn from_args(args: &TargetArgs) -> Result<Self> {
        match args.density {
            DensityKind::Normal => Ok(Self::Normal(StdNormal::new(args.dim))),
            DensityKind::Correlated => {
                if args.dim < 2 {
                    bail!("correlated density needs --dim >= 2, got {}", args.dim);
                }
                let n = args.dim;
                let sigma =
                    DMatrix::from_fn(n, n, |i, j| if i == j { 1.0 } else { args.rho });
                let normal = MultiNormal::new(DVector::zeros(n), sigma)
                    .with_context(|| format!("rho={} is not a valid correlation", args.rho))?;
                Ok(Self::Correlated(normal))
            }
        }
    }
}

impl Density for Target {
    fn dim(&self) -> usize {
        match self {
            Self::Normal(d) => d.dim(),
            Self::Correlated(d) => d.dim(),
        }
    }
    fn pdf(&self, x: &DVector<f64>) -> f64 {
        match self {
            Self::Normal(d) => d.pdf(x),
            Self::Correlated(d) => d.pdf(x),
        }
    }
    fn dpdf(&self, x: &DVector<f64>) -> Option<DVector<f64>> {
        match self {
            Self::Normal(d) => d.dpdf(x),
            Self::Correlated(d) => d.dpdf(x),
        }
    }
    fn center(&self) -> Option<DVector<f64>> {
        match self {
            Self::Normal(d) => d.center(),
            Self::Correlated(d) => d.center(),
        }
    }
    fn volume(&self) -> Option<f64> {
        match self {
            Self::Normal(d) => d.volume(),
            Self::Correlated(d) => d.volume(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HatSummary {
    dim: usize,
    center: Vec<f64>,
    cones: usize,
    vertices: usize,
    volume: f64,
    expected_acceptance: Option<f64>,
    passes: usize,
    splits: usize,
    stop: String,
    violations: u64,
}

impl HatSummary {
    fn new<D: Density>(hat: &Hat, density: &D) -> Self {
        let refinement = hat.refinement();
        Self {
            dim: hat.dim(),
            center: hat.center().iter().copied().collect(),
            cones: hat.cone_count(),
            vertices: hat.vertex_count(),
            volume: hat.volume(),
            expected_acceptance: hat.expected_acceptance(density),
            passes: refinement.passes,
            splits: refinement.splits,
            stop: format!("{:?}", refinement.stop),
            violations: hat.violations(),
        }
    }
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Sample { target, count, out } => sample(&target, count, &out),
        Action::Hat { target } => hat(&target),
        Action::Report => report(),
    }
}

fn generator(args: &TargetArgs) -> Result<ConeRou<Target>> {
    let mut cfg = HatCfg::with_max_cones(args.max_cones);
    cfg.verify = args.verify;
    let density = Target::from_args(args)?;
    let gen = ConeRou::new(density, &cfg, args.seed).context("building hat")?;
    Ok(gen)
}

fn target_params(args: &TargetArgs) -> serde_json::Value {
    json!({
        "density": format!("{:?}", args.density).to_lowercase(),
        "dim": args.dim,
        "rho": args.rho,
        "max_cones": args.max_cones,
        "seed": args.seed,
        "verify": args.verify,
    })
}

fn sample(args: &TargetArgs, count: usize, out: &str) -> Result<()> {
    tracing::info!(?args, count, out, "sample");
    let mut gen = generator(args)?;
    let samples: Vec<Vec<f64>> = gen
        .sample_n(count)
        .into_iter()
        .map(|x| x.iter().copied().collect())
        .collect();
    let summary = HatSummary::new(gen.hat(), gen.density());
    if summary.violations > 0 {
        tracing::warn!(violations = summary.violations, "hat violations detected");
    }

    let out_path = Path::new(out);
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
    }
    let doc = json!({ "samples": samples, "hat": summary });
    std::fs::write(out_path, serde_json::to_vec_pretty(&doc)?)
        .with_context(|| format!("writing {out}"))?;

    let params = target_params(args);
    let prov = provenance::Sidecar::new(out_path, args.seed, count, &params, &summary)
        .write(out_path)?;
    tracing::info!(provenance = %prov.display(), "wrote samples");
    Ok(())
}

fn hat(args: &TargetArgs) -> Result<()> {
    let gen = generator(args)?;
    let summary = HatSummary::new(gen.hat(), gen.density());
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn report() -> Result<()> {
    let obj = json!({
        "code_rev": provenance::code_rev(),
        "version": roucone::VERSION,
        "params": {},
        "outputs": []
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}
