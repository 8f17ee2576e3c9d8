#[macro_use]
extern crate log;

use abstutil::Timer;
use anyhow::Result;
use structopt::StructOpt;

use model::{Catalog, DirInputs, SynthConfig};

#[derive(StructOpt)]
#[structopt(name = "generate_gtfs", about = "Synthesizes a GTFS feed from a route catalog")]
struct Args {
    /// The path to the route catalog JSON
    #[structopt(long, default_value = "routes.json")]
    catalog: String,
    /// The directory with `<relation_id>/stops.geojson` and `<relation_id>/ways.geojson`. Overrides
    /// the config.
    #[structopt(long)]
    route_data: Option<String>,
    /// The directory with rail timetables, named `<agency_id>_<direction_id>.csv`. Overrides the
    /// config.
    #[structopt(long)]
    timetables: Option<String>,
    /// An optional JSON file with synthesis settings
    #[structopt(long)]
    config: Option<String>,
    /// The directory to write the GTFS tables to
    #[structopt(long, default_value = "gtfs")]
    output: String,
    /// Also bundle the tables into a zip archive at this path
    #[structopt(long)]
    zip: Option<String>,
}

impl Args {
    fn config(&self) -> Result<SynthConfig> {
        let mut config = match self.config {
            Some(ref path) => SynthConfig::load(path)?,
            None => SynthConfig::default(),
        };
        if let Some(ref dir) = self.route_data {
            config.route_data_dir = dir.clone();
        }
        if let Some(ref dir) = self.timetables {
            config.timetable_dir = dir.clone();
        }
        Ok(config)
    }

    fn run(self, timer: &mut Timer) -> Result<()> {
        let config = self.config()?;
        timer.start("load catalog");
        let catalog = Catalog::load(&self.catalog)?;
        timer.stop("load catalog");

        let inputs = DirInputs {
            route_data_dir: config.route_data_dir.clone(),
            timetable_dir: config.timetable_dir.clone(),
        };
        let gtfs = model::synthesize(&catalog, &config, &inputs, timer)?;
        gtfs.validate()?;
        gtfs.summarize();

        gtfs.write_to_dir(&self.output)?;
        if let Some(ref path) = self.zip {
            gtfs.write_to_zip(path)?;
        }
        Ok(())
    }
}

fn main() {
    abstutil::logger::setup();

    let args = Args::from_iter(abstutil::cli_args());
    let mut timer = Timer::new("generate GTFS");
    if let Err(err) = args.run(&mut timer) {
        error!("Failed to generate GTFS: {err}");
        std::process::exit(1);
    }
}
