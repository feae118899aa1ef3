//! Indented text output for built trees.
//!
//! [`ToTokens`] values write themselves into a [`Printer`]; [`TreePrinter`]
//! is the plain two-space printer used for `Display` output.

/// Sink for indented text.
pub trait Printer: Sized {
    fn buf(&self) -> &str;
    fn buf_mut(&mut self) -> &mut String;
    fn indent_level(&self) -> usize;
    fn set_indent(&mut self, level: usize);
    fn into_string(self) -> String;

    /// Spaces per indent level.
    fn indent_width(&self) -> usize {
        2
    }

    fn word(&mut self, s: &str) {
        self.buf_mut().push_str(s);
    }

    fn char(&mut self, c: char) {
        self.buf_mut().push(c);
    }

    fn space(&mut self) {
        self.char(' ');
    }

    /// Appends a newline followed by the current indentation.
    fn newline(&mut self) {
        let width = self.indent_level() * self.indent_width();
        self.char('\n');
        self.buf_mut().extend(std::iter::repeat_n(' ', width));
    }

    fn indent(&mut self) {
        self.set_indent(self.indent_level() + 1);
    }

    /// Saturates at 0.
    fn dedent(&mut self) {
        let level = self.indent_level();
        if level > 0 {
            self.set_indent(level - 1);
        }
    }

    fn open_block(&mut self, open: &str) {
        self.word(open);
        self.indent();
    }

    fn close_block(&mut self, close: &str) {
        self.dedent();
        self.newline();
        self.word(close);
    }

    fn write<T: ToTokens<Printer = Self>>(&mut self, value: &T) {
        value.write(self);
    }

    /// Writes items separated by `sep` and a space.
    fn write_separated_inline<'a, T, I>(&mut self, items: I, sep: &str)
    where
        T: ToTokens<Printer = Self> + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        for (idx, item) in items.into_iter().enumerate() {
            if idx > 0 {
                self.word(sep);
                self.space();
            }
            self.write(item);
        }
    }
}

/// Converts a value back into text.
pub trait ToTokens {
    type Printer: Printer;

    fn write(&self, p: &mut Self::Printer);

    fn to_string_formatted(&self) -> String
    where
        Self::Printer: Default,
    {
        let mut printer = Self::Printer::default();
        self.write(&mut printer);
        printer.into_string()
    }
}

impl<T: ToTokens> ToTokens for Option<T> {
    type Printer = T::Printer;

    fn write(&self, p: &mut Self::Printer) {
        if let Some(v) = self {
            v.write(p);
        }
    }
}

#[derive(Debug, Default)]
pub struct TreePrinter {
    buf: String,
    indent: usize,
}

impl Printer for TreePrinter {
    fn buf(&self) -> &str {
        &self.buf
    }

    fn buf_mut(&mut self) -> &mut String {
        &mut self.buf
    }

    fn indent_level(&self) -> usize {
        self.indent
    }

    fn set_indent(&mut self, level: usize) {
        self.indent = level;
    }

    fn into_string(self) -> String {
        self.buf
    }
}
