use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use pretty_env_logger;
use std::io::stdout;
use std::process::ExitCode;
use std::{error::Error, path::PathBuf};
use xspharm::engine::LegendreFunctions;
use xspharm::grid::GridType;
use xspharm::io::{read_field_csv, write_dataset, write_dataset_csv, write_field, write_field_csv};
use xspharm::labeled::{Labeled, LabeledField};
use xspharm::plot::make_zonal_mean_plot;
use xspharm::xspharm::{Xspharm, XspharmBuilder};

#[derive(Parser, Debug)]
#[command(
    author,
    about = "Spherical harmonic operations on gridded CSV fields",
    long_about = None,
    version = env!("XSPHARM_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Latitude layout of the input grid
    #[clap(short, long, default_value = "regular")]
    gridtype: GridTypeKind,

    /// Sphere radius in meters
    #[clap(long, default_value = "6.3712e6")]
    rsphere: f64,

    /// Planetary rotation rate in 1/s, used by uv2absvor
    #[clap(long, default_value = "7.292e-5")]
    omega: f64,

    /// Precompute Legendre functions or recompute them on every transform
    #[clap(long, default_value = "stored")]
    legfunc: LegfuncKind,

    /// Name of the latitude dimension
    #[clap(long, default_value = "lat")]
    lat_dim: String,

    /// Name of the longitude dimension
    #[clap(long, default_value = "lon")]
    lon_dim: String,

    /// Output CSV path (default: stdout)
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Show a zonal-mean plot of the first output variable
    #[clap(long, action)]
    show_plot: bool,

    /// Save the zonal-mean plot to an HTML file
    #[clap(long)]
    save_plot: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Triangular truncation of a scalar field
    Truncate {
        input: PathBuf,
        #[clap(short, long)]
        ntrunc: usize,
    },
    /// Exponential spectral taper of a scalar field
    Taper {
        input: PathBuf,
        #[clap(short, long)]
        ntrunc: usize,
        /// Taper order
        #[clap(short, long, default_value = "2.0")]
        r: f64,
    },
    /// Streamfunction and velocity potential from wind components
    Uv2sfvp {
        u: PathBuf,
        v: PathBuf,
        #[clap(short, long)]
        ntrunc: Option<usize>,
    },
    /// Relative vorticity and divergence from wind components
    Uv2vordiv {
        u: PathBuf,
        v: PathBuf,
        #[clap(short, long)]
        ntrunc: Option<usize>,
    },
    /// Absolute vorticity from wind components
    Uv2absvor {
        u: PathBuf,
        v: PathBuf,
        #[clap(short, long)]
        ntrunc: Option<usize>,
    },
    /// Rotational wind from streamfunction
    Sf2uv {
        sf: PathBuf,
        #[clap(short, long)]
        ntrunc: Option<usize>,
    },
    /// Divergent wind from velocity potential
    Vp2uv {
        vp: PathBuf,
        #[clap(short, long)]
        ntrunc: Option<usize>,
    },
    /// Full wind from streamfunction and velocity potential
    Sfvp2uv {
        sf: PathBuf,
        vp: PathBuf,
        #[clap(short, long)]
        ntrunc: Option<usize>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum GridTypeKind {
    #[default]
    Regular,
    Gaussian,
}

impl From<GridTypeKind> for GridType {
    fn from(kind: GridTypeKind) -> Self {
        match kind {
            GridTypeKind::Regular => GridType::Regular,
            GridTypeKind::Gaussian => GridType::Gaussian,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum LegfuncKind {
    #[default]
    Stored,
    Computed,
}

impl From<LegfuncKind> for LegendreFunctions {
    fn from(kind: LegfuncKind) -> Self {
        match kind {
            LegfuncKind::Stored => LegendreFunctions::Stored,
            LegfuncKind::Computed => LegendreFunctions::Computed,
        }
    }
}

fn build_xspharm(cli: &Cli, reference: &LabeledField) -> Result<Xspharm, Box<dyn Error>> {
    let gridtype = GridType::from(cli.gridtype);
    let legfunc = LegendreFunctions::from(cli.legfunc);
    let xsp = XspharmBuilder::default()
        .grid(reference)
        .gridtype(&gridtype)
        .rsphere(&cli.rsphere)
        .omega(&cli.omega)
        .legfunc(&legfunc)
        .lat_dim(&cli.lat_dim)
        .lon_dim(&cli.lon_dim)
        .build()?;
    Ok(xsp)
}

fn run_pair<F>(cli: &Cli, left: &PathBuf, right: &PathBuf, op: F) -> Result<Labeled, Box<dyn Error>>
where
    F: FnOnce(&Xspharm, &LabeledField, &LabeledField) -> Result<Labeled, Box<dyn Error>>,
{
    let left = read_field_csv(left)?;
    let right = read_field_csv(right)?;
    let xsp = build_xspharm(cli, &left)?;
    op(&xsp, &left, &right)
}

fn run_single<F>(cli: &Cli, input: &PathBuf, op: F) -> Result<Labeled, Box<dyn Error>>
where
    F: FnOnce(&Xspharm, &LabeledField) -> Result<Labeled, Box<dyn Error>>,
{
    let field = read_field_csv(input)?;
    let xsp = build_xspharm(cli, &field)?;
    op(&xsp, &field)
}

fn first_field(result: &Labeled) -> Option<&LabeledField> {
    match result {
        Labeled::Field(field) => Some(field),
        Labeled::Dataset(dataset) => dataset.iter().next(),
    }
}

fn write_result(result: &Labeled, output: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    match (result, output) {
        (Labeled::Field(field), Some(path)) => write_field_csv(field, path)?,
        (Labeled::Dataset(dataset), Some(path)) => write_dataset_csv(dataset, path)?,
        (Labeled::Field(field), None) => write_field(field, stdout().lock())?,
        (Labeled::Dataset(dataset), None) => write_dataset(dataset, stdout().lock())?,
    }
    if let Some(path) = output {
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn entrypoint() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Truncate { input, ntrunc } => {
            run_single(&cli, input, |xsp, f| Ok(xsp.truncate(f, *ntrunc)?))?
        }
        Command::Taper { input, ntrunc, r } => {
            run_single(&cli, input, |xsp, f| Ok(xsp.exp_taper(f, *ntrunc, *r)?))?
        }
        Command::Uv2sfvp { u, v, ntrunc } => run_pair(&cli, u, v, |xsp, u, v| {
            Ok(Labeled::Dataset(xsp.uv2sfvp(u, v, *ntrunc)?))
        })?,
        Command::Uv2vordiv { u, v, ntrunc } => run_pair(&cli, u, v, |xsp, u, v| {
            Ok(Labeled::Dataset(xsp.uv2vordiv(u, v, *ntrunc)?))
        })?,
        Command::Uv2absvor { u, v, ntrunc } => run_pair(&cli, u, v, |xsp, u, v| {
            Ok(Labeled::Field(xsp.uv2absvor(u, v, *ntrunc)?))
        })?,
        Command::Sf2uv { sf, ntrunc } => run_single(&cli, sf, |xsp, sf| {
            Ok(Labeled::Dataset(xsp.sf2uv(sf, *ntrunc)?))
        })?,
        Command::Vp2uv { vp, ntrunc } => run_single(&cli, vp, |xsp, vp| {
            Ok(Labeled::Dataset(xsp.vp2uv(vp, *ntrunc)?))
        })?,
        Command::Sfvp2uv { sf, vp, ntrunc } => run_pair(&cli, sf, vp, |xsp, sf, vp| {
            Ok(Labeled::Dataset(xsp.sfvp2uv(sf, vp, *ntrunc)?))
        })?,
    };

    write_result(&result, cli.output.as_ref())?;

    if cli.show_plot || cli.save_plot.is_some() {
        let field = first_field(&result).ok_or("no output variable to plot")?;
        let plot = make_zonal_mean_plot(field, &cli.lat_dim, &cli.lon_dim)?;
        if let Some(save_path) = &cli.save_plot {
            plot.write_html(save_path);
            info!("Saved plot to {}", save_path.display());
        }
        if cli.show_plot {
            plot.show();
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    match entrypoint() {
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}
