use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP control API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080", help = "Listen address")]
        addr: String,
    },
    /// Run schema discovery against the source database and print the
    /// ranked candidates and generated mapping.
    Discover {
        #[arg(
            long,
            help = "If specified, writes the discovery JSON to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Run a catalog migration.
    Migrate {
        #[arg(long, help = "Continue after the most recent checkpoint")]
        resume: bool,

        #[arg(long, help = "Extract and transform only; create nothing at the target")]
        dry_run: bool,

        #[arg(
            long,
            help = "DESTRUCTIVE: delete existing target products with matching handles before re-creating them"
        )]
        reseed: bool,

        #[arg(long, help = "Records per extraction batch")]
        batch_size: Option<u32>,

        #[arg(long, help = "Stop after this many records")]
        max_products: Option<u64>,

        #[arg(long, help = "Extract through the mapping saved by this discovery job")]
        mapping_job: Option<String>,

        #[arg(long, help = "Extract through a field mapping read from this JSON file")]
        mapping_file: Option<String>,
    },
    /// Export source tables to CSV backups.
    Export {
        #[arg(long, value_delimiter = ',', help = "Tables to export")]
        tables: Vec<String>,

        #[arg(long, help = "Also export CREATE TABLE statements")]
        schema: bool,

        #[arg(long, help = "Gzip each artifact")]
        compress: bool,

        #[arg(long, help = "Output directory (defaults to ./backup)")]
        output: Option<String>,
    },
    /// Show a job document.
    Job {
        #[arg(help = "Job ID to inspect")]
        id: String,

        #[arg(long, help = "Print the full job document as JSON")]
        json: bool,
    },
}
