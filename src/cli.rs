use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ironplan", version, about = "Periodized training plans and load tracking")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Emit machine-readable JSON instead of colorful text.
    #[arg(global = true, long)]
    pub json: bool,

    /// Print debug diagnostics to stderr.
    #[arg(global = true, short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Exercise catalog
    #[command(subcommand, visible_alias = "ex")]
    Exercise(ExerciseCmd),

    /// Program templates
    #[command(subcommand, visible_alias = "p")]
    Program(ProgramCmd),

    /// Workout log
    #[command(subcommand, visible_alias = "l")]
    Log(LogCmd),

    /// Record today's readiness check-in
    #[command(visible_alias = "ci")]
    Checkin {
        /// Sleep quality (1-5)
        #[arg(long)]
        sleep: Option<u8>,

        /// Energy (1-5)
        #[arg(long)]
        energy: Option<u8>,

        /// Soreness (1-5, higher is more sore)
        #[arg(long)]
        soreness: Option<u8>,

        /// Motivation (1-5)
        #[arg(long)]
        motivation: Option<u8>,

        /// Resting heart rate in bpm
        #[arg(long)]
        rhr: Option<u32>,

        /// Heart-rate variability in ms
        #[arg(long)]
        hrv: Option<f64>,

        #[arg(short, long)]
        note: Option<String>,

        /// Date in YYYY-MM-DD format (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Show readiness scores for the last few days
    #[command(visible_alias = "r")]
    Readiness {
        /// Number of days to show
        #[arg(short = 'n', long, default_value = "14")]
        days: u32,

        /// Last day of the window (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Show acute and chronic training load
    Status {
        /// Time period in days (defaults to 42)
        #[arg(short = 'n', long, default_value = "42")]
        days: u32,

        /// Show graph instead of a table
        #[arg(short, long)]
        graph: bool,
    },

    /// Show prescribed and logged days in a calendar view
    #[command(visible_alias = "cal")]
    Calendar {
        /// Year to show (defaults to current year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Month to show (1-12, defaults to current month)
        #[arg(short, long)]
        month: Option<u32>,

        /// Program name or id (defaults to the latest import)
        #[arg(short, long)]
        program: Option<String>,
    },

    /// Athlete profile
    #[command(subcommand)]
    Profile(ProfileCmd),

    /// View or edit ironplan config
    #[command(subcommand)]
    Config(ConfigCmd),
}

//
// Commands
//

#[derive(Debug, Subcommand)]
pub enum ExerciseCmd {
    /// List catalog exercises
    #[command(visible_alias = "l")]
    List {
        /// Filter by movement pattern
        #[arg(short, long)]
        pattern: Option<String>,

        /// Only exercises usable with this equipment (comma-separated)
        #[arg(short, long)]
        equipment: Option<String>,
    },

    /// Show detailed exercise information
    #[command(visible_alias = "s", trailing_var_arg = true)]
    Show {
        /// Exercise id or name
        exercise: Vec<String>,
    },

    /// Add a custom exercise
    #[command(visible_alias = "a")]
    Add {
        /// Exercise name
        name: String,

        /// Movement pattern
        #[arg(short, long)]
        pattern: String,

        /// Equipment, comma-separated (any one is enough)
        #[arg(short, long, default_value = "bodyweight")]
        equipment: String,

        /// Muscles worked, comma-separated
        #[arg(short, long)]
        muscles: String,
    },

    /// Delete a custom exercise
    #[command(visible_alias = "d")]
    Delete {
        /// Exercise id
        id: String,
    },

    /// List substitutes for an exercise
    #[command(visible_alias = "sw")]
    Swaps {
        /// Exercise id or name
        exercise: String,

        /// Equipment to check against (defaults to the profile's)
        #[arg(short, long)]
        equipment: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ProgramCmd {
    /// Validate and store a program template (TOML or JSON)
    #[command(visible_alias = "i")]
    Import {
        file: String,

        /// First day of the program in YYYY-MM-DD format (defaults to today)
        #[arg(short, long)]
        start: Option<String>,
    },

    /// Check a template without storing it
    #[command(visible_alias = "v")]
    Validate { file: String },

    /// List programs
    #[command(visible_alias = "l")]
    List,

    /// Show a program's generated calendar
    #[command(visible_alias = "s")]
    Show {
        /// Program name or id (defaults to the latest import)
        program: Option<String>,

        /// Only this week
        #[arg(short, long)]
        week: Option<u32>,
    },

    /// Show the prescription for a date
    #[command(visible_alias = "t")]
    Today {
        /// Program name or id (defaults to the latest import)
        program: Option<String>,

        /// Date in YYYY-MM-DD format (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Delete a program
    #[command(visible_alias = "d")]
    Delete {
        /// Program name or id
        program: String,
    },
}

#[derive(Subcommand)]
pub enum LogCmd {
    /// Log a workout - Usage: log add LABEL -x "backSquat:100:5x5@8"
    #[command(visible_alias = "a")]
    Add {
        /// Session label
        label: String,

        /// Date in YYYY-MM-DD format (defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Session type (strength, cardio, mobility, ...)
        #[arg(short = 't', long = "type")]
        session_type: Option<String>,

        /// Performed exercise as NAME:WEIGHT:SETSxREPS[@RPE]; repeatable
        #[arg(short = 'x', long = "exercise")]
        exercises: Vec<String>,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<u32>,

        /// Mark the session as not completed
        #[arg(long)]
        incomplete: bool,
    },

    /// List logged workouts
    #[command(visible_alias = "l")]
    List {
        /// From date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// To date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Delete a logged workout
    #[command(visible_alias = "d")]
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum ProfileCmd {
    /// Show the athlete profile
    Show,

    /// Update body weight and heart-rate benchmarks
    Set {
        #[arg(long)]
        body_weight: Option<f64>,

        #[arg(long)]
        max_hr: Option<u32>,

        /// Aerobic threshold heart rate
        #[arg(long)]
        aerobic: Option<u32>,

        /// Anaerobic threshold heart rate
        #[arg(long)]
        anaerobic: Option<u32>,
    },

    /// Replace available equipment (comma-separated)
    Equipment { equipment: String },

    /// Record a personal record - Usage: profile pr KEY VALUE
    Pr {
        key: String,
        value: f64,

        /// Date in YYYY-MM-DD format (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Show all config keys
    List,

    /// Get the value of a key
    Get { key: String },

    /// Set or override a key
    Set { key: String, val: String },

    /// Remove a key
    Unset { key: String },
}
