//! # CLI Commands
//! A module for all the commands that can be run from the CLI

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs every dimension of the selected explores and pinpoints the ones whose SQL fails
    Sql {
        /// Explores to validate as model/explore; `*` matches any model or explore
        #[arg(long, value_name = "MODEL/EXPLORE", num_args = 1.., value_delimiter = ',')]
        explores: Vec<String>,

        /// Explores to skip, same syntax as --explores
        #[arg(long, value_name = "MODEL/EXPLORE", num_args = 1.., value_delimiter = ',')]
        exclude: Vec<String>,

        /// Only validate models belonging to this LookML project
        #[arg(long)]
        project: Option<String>,

        /// Report errors per explore without narrowing them down to individual fields
        #[arg(long)]
        fail_fast: bool,

        /// Maximum number of queries running on Looker at the same time
        #[arg(long)]
        concurrency: Option<usize>,

        /// Seconds after which a passing query is reported as long-running
        #[arg(long, value_name = "SECONDS")]
        runtime_threshold: Option<f64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Prints the SQL Looker generates for an explore, or for one of its dimensions
    Compile {
        /// Model name
        model: String,

        /// Explore name
        explore: String,

        /// Compile a single dimension instead of the whole explore
        #[arg(long)]
        field: Option<String>,
    },
}
