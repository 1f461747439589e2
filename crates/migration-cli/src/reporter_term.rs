//! The interactive `Reporter` used by the binary: progress narrated to
//! stderr with `colored`, prompts read from stdin. Mirrors
//! `libs/test-cli`'s `eprintln!("{}", ....green().bold())` idiom.

use colored::*;
use migration_connector::model::{Phase, TableClass};
use migration_connector::reporter::Reporter;
use std::io::{self, Write};

#[derive(Debug, Default, Clone, Copy)]
pub struct TermReporter;

impl Reporter for TermReporter {
    fn phase_started(&self, database: &str, phase: Phase) {
        eprintln!("{} {} {}", phase.tag().blue().bold(), database.bold(), "starting".blue());
    }

    fn table_classified(&self, database: &str, table: &str, class: &TableClass) {
        eprintln!("  {database}.{table} -> {}", class.label().cyan());
    }

    fn table_completed(&self, database: &str, table: &str, found: u64, inserted: u64, failed: u64) {
        if failed > 0 {
            eprintln!(
                "  {} {database}.{table} found={found} inserted={inserted} {}",
                "done".green(),
                format!("failed={failed}").red()
            );
        } else {
            eprintln!("  {} {database}.{table} found={found} inserted={inserted}", "done".green());
        }
    }

    fn table_skipped(&self, database: &str, table: &str, reason: &str) {
        eprintln!("  {} {database}.{table} ({reason})", "skip".yellow());
    }

    fn table_failed(&self, database: &str, table: &str, reason: &str) {
        eprintln!("  {} {database}.{table}: {reason}", "failed".red().bold());
    }

    fn warning(&self, message: &str) {
        eprintln!("{} {message}", "warning:".yellow().bold());
    }

    fn prompt_yes_no(&self, question: &str) -> bool {
        loop {
            eprint!("{question} [y/N] ");
            let _ = io::stderr().flush();
            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_err() {
                return false;
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return true,
                "n" | "no" | "" => return false,
                _ => continue,
            }
        }
    }

    fn prompt_literal(&self, prompt: &str, expected: &str) -> bool {
        eprint!("{prompt} ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            return false;
        }
        line.trim() == expected
    }

    fn summary(&self, databases_migrated: usize, tables_completed: usize, tables_failed: usize, tables_skipped: usize) {
        eprintln!(
            "{} databases={databases_migrated} tables_completed={tables_completed} tables_failed={} tables_skipped={tables_skipped}",
            "summary".bold(),
            if tables_failed > 0 {
                tables_failed.to_string().red().to_string()
            } else {
                tables_failed.to_string()
            }
        );
    }
}
