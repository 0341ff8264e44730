//! `deltasim list` — show the demo designs.

use deltasim_blocks::designs;

use crate::GlobalArgs;

/// Prints one line per design.
pub fn run(_global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    print!("{}", render());
    Ok(0)
}

fn render() -> String {
    let width = designs().iter().map(|d| d.name.len()).max().unwrap_or(0);
    designs()
        .iter()
        .map(|d| format!("{:<width$}  {}\n", d.name, d.description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_design() {
        let out = render();
        assert_eq!(out.lines().count(), designs().len());
        assert!(out.lines().any(|l| l.starts_with("counter ")));
        assert!(out.lines().any(|l| l.starts_with("transactor ")));
    }
}
