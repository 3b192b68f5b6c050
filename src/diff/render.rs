//! Pure text transforms applied to file contents and diff output.

/// Render a file with no prior version: every line prefixed with `"+ "`.
pub fn render_added(content: &str) -> String {
    content
        .split('\n')
        .map(|line| format!("+ {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reduce unified diff output to hunk headers and added/removed lines.
///
/// Everything before the first `@@` header (the `diff --git`, `index`,
/// `---` and `+++` metadata) is discarded, as are context lines and
/// `\ No newline at end of file` markers. Returns an empty string when
/// the output contains no hunk.
pub fn reduce_diff_output(output: &str) -> String {
    let lines: Vec<&str> = output.split('\n').collect();
    let Some(start) = lines.iter().position(|l| l.starts_with("@@")) else {
        return String::new();
    };

    lines[start..]
        .iter()
        .filter(|l| l.starts_with('+') || l.starts_with('-') || l.starts_with("@@"))
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_added_prefixes_every_line() {
        assert_eq!(render_added("a\nb"), "+ a\n+ b");
    }

    #[test]
    fn render_added_keeps_trailing_empty_line() {
        assert_eq!(render_added("fn main() {}\n"), "+ fn main() {}\n+ ");
    }

    #[test]
    fn render_added_empty_content() {
        assert_eq!(render_added(""), "+ ");
    }

    #[test]
    fn reduce_strips_headers_and_context() {
        let raw = "diff --git a/old-x.tmp b/new-x.tmp\n\
                   index 111..222 100644\n\
                   --- a/old-x.tmp\n\
                   +++ b/new-x.tmp\n\
                   @@ -1,3 +1,3 @@\n \
                   keep\n\
                   -old line\n\
                   +new line\n \
                   tail\n\
                   \\ No newline at end of file\n";
        assert_eq!(reduce_diff_output(raw), "@@ -1,3 +1,3 @@\n-old line\n+new line");
    }

    #[test]
    fn reduce_keeps_multiple_hunks() {
        let raw = "@@ -1 +1 @@\n-a\n+b\n@@ -10 +10 @@ fn x()\n-c\n+d";
        assert_eq!(reduce_diff_output(raw), raw);
    }

    #[test]
    fn reduce_without_hunk_is_empty() {
        assert_eq!(reduce_diff_output(""), "");
        assert_eq!(reduce_diff_output("Binary files a/x and b/x differ\n"), "");
    }
}
