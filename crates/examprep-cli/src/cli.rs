use clap::{Parser, Subcommand};
use examprep_core::QuestionType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "examprep", version)]
#[command(about = "Generate and grade practice exams from your study notes", long_about = None)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Embed with the built-in hashing embedder instead of Ollama"
    )]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Replace the indexed study material with these files (.txt, .md)")]
    Ingest {
        #[arg(required = true, help = "Documents to index")]
        files: Vec<PathBuf>,
    },

    #[command(about = "Generate an exam on a topic from the indexed material")]
    Generate {
        #[arg(short, long, help = "Topic to generate questions about")]
        topic: String,

        #[arg(
            short,
            long,
            default_value = "mcq",
            help = "Question type: mcq, true-false, blanks, short, long, essay"
        )]
        kind: QuestionType,

        #[arg(short, long, help = "Number of questions (defaults to the configured value)")]
        count: Option<usize>,
    },

    #[command(about = "Show the current exam")]
    Show,

    #[command(about = "Submit answers for grading")]
    Submit {
        #[arg(
            short,
            long,
            help = "JSON object mapping question numbers to answers, e.g. '{\"1\": \"B\"}'"
        )]
        answers: String,
    },

    #[command(about = "Show the score report of the last submission")]
    Results {
        #[arg(long, help = "Print the report as JSON")]
        json: bool,
    },

    #[command(about = "Delete the index and forget the current session")]
    Reset,

    #[command(about = "Show configuration")]
    Config {
        #[arg(long, help = "Only print the config file location")]
        path: bool,
    },
}
