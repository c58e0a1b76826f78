use prettytable::format::{FormatBuilder, LinePosition, LineSeparator};
use prettytable::{Row, Table};

/// Something that prints as one line of an output table
pub trait ToRow {
    fn columns() -> Row;
    fn to_row(&self) -> Row;
}

/// Print `rows` under their column titles, or `empty` if there aren't any
pub fn print_rows<T, I>(rows: I, empty: &str)
where
    T: ToRow,
    I: IntoIterator<Item = T>,
{
    let mut table = Table::new();
    table.set_format(
        FormatBuilder::new()
            .padding(1, 1)
            .separator(LinePosition::Title, LineSeparator::new('-', '+', '+', '+'))
            .build(),
    );
    table.set_titles(T::columns());
    let mut count = 0;
    for row in rows {
        table.add_row(row.to_row());
        count += 1;
    }
    if count == 0 {
        println!("{}", empty);
    } else {
        table.printstd();
    }
}
