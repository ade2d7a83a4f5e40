use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "baan")]
#[command(about = "Thai real-estate price estimates and market analysis.")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml", global = true)]
    pub config: String,

    /// Read from the local SQLite snapshot instead of the hosted store
    #[arg(long, global = true)]
    pub offline: bool,

    /// Read listings from a JSON file (array of listing rows)
    #[arg(long, global = true)]
    pub listings_file: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Estimate the price of a property
    #[command(alias = "e")]
    Estimate(EstimateArgs),
    /// Market trends for an area and property type
    #[command(alias = "t")]
    Trends {
        #[arg(long)]
        location: Option<String>,
        #[arg(long = "type")]
        property_type: Option<String>,
        /// 3m, 6m, 1y or 2y
        #[arg(long, default_value = "1y")]
        timeframe: String,
    },
    /// Compare up to four listings side by side
    #[command(alias = "c")]
    Compare {
        /// Narrow the listings before picking
        #[arg(long)]
        search: Option<String>,
        /// Listing ids to compare; the two newest when omitted
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
    },
    /// Geolocated listings as map markers
    #[command(alias = "m")]
    Map {
        #[arg(long)]
        search: Option<String>,
    },
    /// Randomised price forecast
    #[command(alias = "f")]
    Forecast(ForecastArgs),
    /// Copy the hosted listings into the local snapshot
    Sync,
}

#[derive(Args)]
pub struct EstimateArgs {
    /// JSON file with an array of estimate forms
    #[arg(long, conflicts_with_all = ["location", "area"])]
    pub batch: Option<String>,
    #[arg(long, default_value = "")]
    pub location: String,
    #[arg(long = "type", default_value = "")]
    pub property_type: String,
    #[arg(long, default_value = "")]
    pub area: String,
    #[arg(long, default_value = "")]
    pub bedrooms: String,
    #[arg(long, default_value = "")]
    pub bathrooms: String,
    #[arg(long, default_value = "")]
    pub year_built: String,
    #[arg(long, default_value = "")]
    pub furnished: String,
}

#[derive(Args)]
pub struct ForecastArgs {
    #[arg(long)]
    pub location: String,
    #[arg(long = "type")]
    pub property_type: String,
    #[arg(long)]
    pub area: f64,
    /// Current price in THB
    #[arg(long)]
    pub price: f64,
    #[arg(long, value_delimiter = ',', default_value = "3m,6m,1y,2y,5y")]
    pub periods: Vec<String>,
    /// Retrain the weights before forecasting
    #[arg(long)]
    pub retrain: bool,
    #[arg(long, default_value_t = 3.0)]
    pub gdp_growth: f64,
    #[arg(long, default_value_t = 2.5)]
    pub interest_rate: f64,
    #[arg(long, default_value_t = 2.0)]
    pub inflation_rate: f64,
    #[arg(long, default_value_t = 0.5)]
    pub population_growth: f64,
    #[arg(long, default_value_t = 1.0)]
    pub construction_index: f64,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
