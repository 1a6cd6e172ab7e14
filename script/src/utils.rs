use colored::*;

pub fn print_banner() {
    println!("{}", r#"
    ____                                 __  _    __      __
   / __ \____ _______________  ____  ____/ /_| |  / /___  / /____
  / /_/ / __ `/ ___/ ___/ __ \/ __ \/ __  / _| | / / __ \/ __/ _ \
 / ____/ /_/ (__  |__  ) /_/ / /_/ / /_/ / /_| |/ / /_/ / /_/  __/
/_/    \__,_/____/____/ .___/\____/\__,_/\__/|___/\____/\__/\___/
                     /_/
    "#.cyan().bold());
    println!("{}", "Anonymous Passport Voting".bright_blue().italic());
    println!();
}

pub fn print_step(msg: &str) {
    println!("{} {}", "➜".cyan().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✔".green().bold(), msg);
}

pub fn print_warn(msg: &str) {
    println!("{} {}", "!".yellow().bold(), msg);
}

pub fn print_error(msg: &str) {
    println!("{} {}", "✖".red().bold(), msg);
}

pub fn print_info(key: &str, value: impl std::fmt::Display) {
    println!("  {}: {}", key.bright_black(), value.to_string().yellow());
}

pub fn print_divider() {
    println!("{}", "-".repeat(45).bright_black());
}
