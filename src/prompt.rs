use anyhow::{Result, bail};
use std::io::{self, BufRead, Write};

/// Fails once stdin is closed, so prompt loops end instead of spinning on EOF.
pub fn prompt_string(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    read_answer(&mut io::stdin().lock())
}

fn read_answer(input: &mut impl BufRead) -> Result<String> {
    let mut s = String::new();
    if input.read_line(&mut s)? == 0 {
        bail!("stdin closed");
    }
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
    Ok(s)
}

/// Пустой ввод — оставить `default`.
pub fn prompt_with_default(prompt: &str, default: &str) -> Result<String> {
    let s = prompt_string(prompt)?;
    Ok(if s.is_empty() { default.to_string() } else { s })
}

pub fn prompt_password_hidden(prompt: &str) -> Result<String> {
    let pw = rpassword::prompt_password(prompt)?;
    Ok(pw)
}

pub fn prompt_hidden_with_default(prompt: &str, default: &str) -> Result<String> {
    let s = prompt_password_hidden(prompt)?;
    Ok(if s.is_empty() { default.to_string() } else { s })
}

/// `[y/N]`, anything but `y` is no.
pub fn confirm(prompt: &str) -> Result<bool> {
    let answer = prompt_string(&format!("{prompt} [y/N] "))?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn eof_is_an_error() {
        assert!(read_answer(&mut Cursor::new("")).is_err());
    }

    #[test]
    fn empty_line_is_an_empty_answer() {
        assert_eq!(read_answer(&mut Cursor::new("\n")).unwrap(), "");
    }

    #[test]
    fn line_endings_are_stripped() {
        assert_eq!(read_answer(&mut Cursor::new("q\r\n")).unwrap(), "q");
        assert_eq!(read_answer(&mut Cursor::new("l\n")).unwrap(), "l");
        assert_eq!(read_answer(&mut Cursor::new("3")).unwrap(), "3");
    }

    #[test]
    fn answers_are_read_one_line_at_a_time() {
        let mut input = Cursor::new("1\n2\n");
        assert_eq!(read_answer(&mut input).unwrap(), "1");
        assert_eq!(read_answer(&mut input).unwrap(), "2");
        assert!(read_answer(&mut input).is_err());
    }
}
