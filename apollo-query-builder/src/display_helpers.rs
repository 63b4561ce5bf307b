use std::fmt;
use std::fmt::Display;

/// Writes indented, or single line, GraphQL text to a formatter.
pub(crate) struct State<'fmt, 'fmt2> {
    indent_level: usize,
    pretty: bool,
    output: &'fmt mut fmt::Formatter<'fmt2>,
}

impl<'a, 'b> State<'a, 'b> {
    pub(crate) fn new(output: &'a mut fmt::Formatter<'b>, pretty: bool) -> State<'a, 'b> {
        Self {
            indent_level: 0,
            pretty,
            output,
        }
    }

    pub(crate) fn write<T: fmt::Display>(&mut self, value: T) -> fmt::Result {
        write!(self.output, "{}", value)
    }

    pub(crate) fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.output.write_fmt(args)
    }

    /// A line break, or a single space in compact mode.
    pub(crate) fn new_line(&mut self) -> fmt::Result {
        if !self.pretty {
            return self.write(" ");
        }
        self.write("\n")?;
        for _ in 0..self.indent_level {
            self.write("  ")?
        }
        Ok(())
    }

    /// Separates top level definitions.
    pub(crate) fn blank_line(&mut self) -> fmt::Result {
        if self.pretty {
            self.write("\n")?;
        }
        self.new_line()
    }

    pub(crate) fn indent_no_new_line(&mut self) {
        self.indent_level += 1;
    }

    pub(crate) fn dedent(&mut self) -> fmt::Result {
        self.indent_level = self.indent_level.saturating_sub(1);
        self.new_line()
    }
}

pub(crate) fn write_indented_lines<T>(
    state: &mut State<'_, '_>,
    values: &[T],
    mut write_line: impl FnMut(&mut State<'_, '_>, &T) -> fmt::Result,
) -> fmt::Result {
    if !values.is_empty() {
        state.indent_no_new_line();
        for value in values {
            state.new_line()?;
            write_line(state, value)?;
        }
        state.dedent()?;
    }
    Ok(())
}

/// Writes `(a, b)`, or nothing for an empty list.
pub(crate) struct DisplayParenthesized<'a, T>(pub(crate) &'a [T]);

impl<T: Display> Display for DisplayParenthesized<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.0.iter();
        if let Some(item) = iter.next() {
            write!(f, "({item}")?;
            iter.try_for_each(|item| write!(f, ", {item}"))?;
            write!(f, ")")?;
        }
        Ok(())
    }
}
