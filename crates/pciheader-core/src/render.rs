//! ASCII table rendering of a configuration header
//!
//! The table has two panes side by side, each four byte-columns wide: the
//! left pane carries register names, the right pane the decoded values, and
//! each row ends with the dword address it covers.
//!
//! ```text
//! |-----------------------------------------------------------|		|-----------------------------------------------------------|
//! |    Byte 0    |   Byte 1     |    Byte 2    |    Byte 3    |		|    Byte 0    |   Byte 1     |    Byte 2    |    Byte 3    |
//! |-----------------------------------------------------------|		|-----------------------------------------------------------|	Address
//! |          Vendor ID          |          Device ID          |		|            0x8086           |            0x1234           |	0x00
//! |-----------------------------------------------------------|		|-----------------------------------------------------------|
//! ```
//!
//! The whole table is built in memory before anything is printed, so a bus
//! error halfway through never leaves a truncated table on the terminal.

use crate::access::{BusAccess, PciDevice};
use crate::decode::{format_hex, RegisterWindow};
use crate::error::{Error, Result, Violation};
use crate::header::read_header_kind;
use crate::schema::{column_width, FieldDescriptor, HeaderKind, Schema, REGISTER_WIDTH};

/// Column headings of one pane
const LEGEND: &str = "|    Byte 0    |   Byte 1     |    Byte 2    |    Byte 3    |";

/// Separator between the name pane and the value pane
const PANE_GAP: &str = "\t\t";

/// Horizontal rule of one pane
fn rule() -> String {
    format!("|{}|", "-".repeat(column_width(REGISTER_WIDTH)))
}

/// Left padding for a register name
fn name_padding(field: &FieldDescriptor) -> usize {
    field.column_width().saturating_sub(field.name.len()) / 2
}

/// Left padding for a decoded value
///
/// Computed from `2 + size` rather than the printed length (`2 + 2 * size`),
/// which shifts wider values right of center. Existing output depends on it.
fn value_padding(field: &FieldDescriptor) -> usize {
    field.column_width().saturating_sub(2 + field.size as usize) / 2
}

/// Append `text` to `out` padded to `width`, followed by a cell border
fn push_cell(out: &mut String, text: &str, width: usize, left: usize) {
    let right = width.saturating_sub(left + text.len());
    out.push_str(&" ".repeat(left));
    out.push_str(text);
    out.push_str(&" ".repeat(right));
    out.push('|');
}

/// Title line naming the device and its header kind
pub fn title(dev: &PciDevice, kind: HeaderKind) -> String {
    format!("Selected device {} is {}", dev.id, kind.with_article())
}

/// Render the header of `dev` using `schema`
///
/// Issues one `read_long` per dword row. The schema is validated first and
/// any violation, like any bus error, aborts the whole table.
pub fn render_table<B: BusAccess + ?Sized>(
    bus: &mut B,
    dev: &PciDevice,
    schema: Schema,
) -> Result<String> {
    schema.validate()?;
    let span = schema.span().ok_or(Error::SchemaViolation {
        field: "End",
        offset: 0,
        violation: Violation::MissingSentinel,
    })?;

    let rule = rule();
    let mut out = String::new();
    out.push_str(&format!("{rule}{PANE_GAP}{rule}\n"));
    out.push_str(&format!("{LEGEND}{PANE_GAP}{LEGEND}\n"));
    out.push_str(&format!("{rule}{PANE_GAP}{rule}\tAddress\n"));

    let fields = schema.fields();
    let mut cursor = 0;
    for address in (0..span).step_by(REGISTER_WIDTH as usize) {
        let window_end = address as u16 + REGISTER_WIDTH as u16;

        // Name pane: consume every field starting inside this dword
        let first = cursor;
        out.push('|');
        while cursor < fields.len() && (fields[cursor].offset as u16) < window_end {
            let field = &fields[cursor];
            push_cell(&mut out, field.name, field.column_width(), name_padding(field));
            cursor += 1;
        }

        let window = RegisterWindow::new(address, bus.read_long(dev, address)?);
        log::trace!("{} [{:#04x}] = {:#010x}", dev.bdf(), address, window.value);

        // Value pane: same fields, same widths
        out.push_str(PANE_GAP);
        out.push('|');
        for field in &fields[first..cursor] {
            if field.is_sentinel() {
                break;
            }
            let value = window.extract(field)?;
            push_cell(
                &mut out,
                &format_hex(value, field.size),
                field.column_width(),
                value_padding(field),
            );
        }

        out.push_str(&format!("\t0x{address:02x}\n"));
        out.push_str(&format!("{rule}{PANE_GAP}{rule}\n"));
    }

    Ok(out)
}

/// Select the layout of `dev`, then render its title line and table
pub fn render_header<B: BusAccess + ?Sized>(bus: &mut B, dev: &PciDevice) -> Result<String> {
    let kind = read_header_kind(bus, dev)?;
    let table = render_table(bus, dev, kind.schema())?;
    Ok(format!("{}\n{}", title(dev, kind), table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::DeviceId;
    use crate::testing::ImageBus;

    fn endpoint_bus() -> (ImageBus, PciDevice) {
        let mut bus = ImageBus::new(DeviceId::new(0, 2, 0));
        bus.set_u16(0x00, 0x8086);
        bus.set_u16(0x02, 0x1234);
        let dev = bus.device();
        (bus, dev)
    }

    fn data_rows(table: &str) -> Vec<&str> {
        table
            .lines()
            .filter(|line| line.contains("\t0x"))
            .collect()
    }

    fn value_cells(row: &str) -> Vec<&str> {
        let (_, values) = row.split_once(PANE_GAP).unwrap();
        let (values, _) = values.split_once('\t').unwrap();
        values
            .split('|')
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .collect()
    }

    fn name_cells(row: &str) -> Vec<&str> {
        let (names, _) = row.split_once(PANE_GAP).unwrap();
        names
            .split('|')
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .collect()
    }

    #[test]
    fn test_endpoint_end_to_end() {
        let (mut bus, dev) = endpoint_bus();
        let out = render_header(&mut bus, &dev).unwrap();

        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("Selected device 0:2:0 is an Endpoint"));

        let rows = data_rows(&out);
        assert_eq!(rows.len(), 16);
        assert_eq!(name_cells(rows[0]), ["Vendor ID", "Device ID"]);
        assert_eq!(value_cells(rows[0])[..2], ["0x8086", "0x1234"]);
        assert!(rows[0].ends_with("\t0x00"));
        assert!(rows[15].ends_with("\t0x3c"));
    }

    #[test]
    fn test_bridge_title_and_rows() {
        let mut bus = ImageBus::new(DeviceId::new(0, 0x1c, 0));
        bus.set_u8(0x0E, 0x81);
        bus.set_u8(0x18, 0x00);
        bus.set_u8(0x19, 0x02);
        bus.set_u8(0x1A, 0x05);
        let dev = bus.device();

        let out = render_header(&mut bus, &dev).unwrap();
        assert!(out.starts_with("Selected device 0:1c:0 is a Bridge\n"));

        let rows = data_rows(&out);
        assert_eq!(
            name_cells(rows[6]),
            ["Primary Bus", "Secondary Bus", "Sub Bus", "Sec Lat timer"]
        );
        assert_eq!(value_cells(rows[6]), ["0x00", "0x02", "0x05", "0x00"]);
        assert_eq!(value_cells(rows[3])[2], "0x81");
        assert_eq!(name_cells(rows[15]), ["IRQ Line", "IRQ Pin", "Bridge Control"]);
    }

    #[test]
    fn test_exact_row_layout() {
        let (mut bus, dev) = endpoint_bus();
        let out = render_table(&mut bus, &dev, Schema::TYPE0).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        let rule = format!("|{}|", "-".repeat(59));
        assert_eq!(lines[0], format!("{rule}\t\t{rule}"));
        assert_eq!(lines[1], format!("{LEGEND}\t\t{LEGEND}"));
        assert_eq!(lines[2], format!("{rule}\t\t{rule}\tAddress"));
        assert_eq!(
            lines[3],
            "|          Vendor ID          |          Device ID          |\t\t\
             |            0x8086           |            0x1234           |\t0x00"
        );
        assert_eq!(lines[4], format!("{rule}\t\t{rule}"));
        // Preamble plus two lines per row
        assert_eq!(lines.len(), 3 + 2 * 16);
    }

    #[test]
    fn test_mixed_width_row() {
        let mut bus = ImageBus::new(DeviceId::new(0, 0, 0));
        bus.set_u32(0x08, 0x0C03_3021);
        let dev = bus.device();
        let out = render_table(&mut bus, &dev, Schema::TYPE0).unwrap();
        let row = data_rows(&out)[2];
        assert_eq!(
            row,
            "| Revision ID  |                 Class Code                 |\t\t\
             |     0x21     |                   0x0C0330                 |\t0x08"
        );
    }

    #[test]
    fn test_one_read_per_row() {
        let (mut bus, dev) = endpoint_bus();
        render_table(&mut bus, &dev, Schema::TYPE0).unwrap();
        assert_eq!(
            bus.long_reads(),
            (0..0x40).step_by(4).collect::<Vec<u8>>()
        );
    }

    #[test]
    fn test_bus_error_aborts_table() {
        let (mut bus, dev) = endpoint_bus();
        bus.fail_at(0x20);
        let err = render_table(&mut bus, &dev, Schema::TYPE0).unwrap_err();
        assert!(matches!(err, Error::BusAccess(_)));
        // Rows after the failing read are never attempted
        assert_eq!(bus.long_reads().last(), Some(&0x20));
    }

    #[test]
    fn test_broken_schema_is_rejected_before_reading() {
        static BROKEN: &[FieldDescriptor] = &[
            FieldDescriptor::new("Vendor ID", 0x00, 2),
            FieldDescriptor::new("End", 0x02, 5),
        ];
        let (mut bus, dev) = endpoint_bus();
        let err = render_table(&mut bus, &dev, Schema::new(BROKEN)).unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaViolation {
                violation: Violation::MissingSentinel,
                ..
            }
        ));
        assert!(bus.long_reads().is_empty());
    }

    #[test]
    fn test_padding() {
        let f = FieldDescriptor::new("BIST", 0x0F, 1);
        assert_eq!(name_padding(&f), 5);
        assert_eq!(value_padding(&f), 5);
        let f = FieldDescriptor::new("BAR 0", 0x10, 4);
        assert_eq!(name_padding(&f), 27);
        assert_eq!(value_padding(&f), 26);
    }
}
