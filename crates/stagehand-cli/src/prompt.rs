//! Terminal prompts for the wizard. Menus go to stderr so that piped test
//! output on stdout stays clean.

use std::io::{self, Write};

use console::style;

/// Reads one line from stdin; `None` on EOF.
fn read_line() -> io::Result<Option<String>> {
    let mut buf = String::new();
    let n = io::stdin().read_line(&mut buf)?;
    if n == 0 {
        Ok(None)
    } else {
        Ok(Some(buf))
    }
}

/// Presents a numbered menu and returns the chosen index, or `None` when the
/// user quits (via `q` or EOF).
pub fn select(message: &str, options: &[String]) -> io::Result<Option<usize>> {
    loop {
        eprintln!("{}", style(message).bold());
        for (i, option) in options.iter().enumerate() {
            eprintln!("  {} {}", style(format!("{})", i + 1)).cyan(), option);
        }
        eprint!("{} ", style("Enter a number, or q to quit:").dim());
        io::stderr().flush()?;

        let Some(line) = read_line()? else {
            return Ok(None);
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match line.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(n - 1)),
            _ => eprintln!("{}", style("Invalid choice.").red()),
        }
    }
}

/// Presents a checkbox menu seeded from `preselected` and returns the indices
/// left checked. Numbers toggle entries, `a`/`n` check or clear everything,
/// an empty line (or EOF) accepts the current selection.
pub fn multi_select(
    message: &str,
    options: &[String],
    preselected: &[bool],
) -> io::Result<Vec<usize>> {
    let mut checked: Vec<bool> = (0..options.len())
        .map(|i| preselected.get(i).copied().unwrap_or(true))
        .collect();

    loop {
        eprintln!("{}", style(message).bold());
        for (i, option) in options.iter().enumerate() {
            let mark = if checked[i] {
                style("[x]").green().to_string()
            } else {
                style("[ ]").dim().to_string()
            };
            eprintln!("  {} {} {}", style(format!("{})", i + 1)).cyan(), mark, option);
        }
        eprint!(
            "{} ",
            style("Toggle with numbers, a for all, n for none, enter to accept:").dim()
        );
        io::stderr().flush()?;

        let Some(line) = read_line()? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        match line {
            "a" | "all" => checked.iter_mut().for_each(|c| *c = true),
            "n" | "none" => checked.iter_mut().for_each(|c| *c = false),
            _ => {
                for token in line.split([' ', ',']).filter(|t| !t.is_empty()) {
                    match token.parse::<usize>() {
                        Ok(n) if (1..=options.len()).contains(&n) => {
                            checked[n - 1] = !checked[n - 1];
                        }
                        _ => eprintln!("{} {}", style("Invalid choice:").red(), token),
                    }
                }
            }
        }
    }

    Ok(checked
        .iter()
        .enumerate()
        .filter_map(|(i, &on)| on.then_some(i))
        .collect())
}

/// Asks a yes/no question; defaults to no.
pub fn confirm(message: &str) -> io::Result<bool> {
    eprint!("{} [y/N] ", style(message).bold());
    io::stderr().flush()?;

    let Some(mut answer) = read_line()? else {
        return Ok(false);
    };
    answer.make_ascii_lowercase();
    Ok(matches!(answer.trim(), "y" | "yes"))
}
