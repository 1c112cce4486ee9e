/// Line writer for generated sources. Output is not reformatted afterwards, so
/// nesting is tracked here: one tab per level.
#[derive(Debug, Default)]
pub struct Formatter {
    out: String,
    depth: usize,
}

impl Formatter {
    pub fn new(depth: usize) -> Self {
        Formatter {
            out: String::with_capacity(4 * 1024),
            depth,
        }
    }

    pub fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.depth {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Writes `text` and indents everything up to the matching [`Formatter::close`].
    pub fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    pub fn close(&mut self, text: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks_are_indented_with_tabs() {
        let mut f = Formatter::new(1);
        f.open("public static class Sort {");
        f.line("public final String order;");
        f.close("}");

        assert_eq!(
            f.finish(),
            "\tpublic static class Sort {\n\t\tpublic final String order;\n\t}\n"
        );
    }

    #[test]
    fn blank_lines_carry_no_indentation() {
        let mut f = Formatter::new(3);
        f.line("");

        assert_eq!(f.finish(), "\n");
    }
}
