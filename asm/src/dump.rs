use crate::assembler::Assembly;
use crate::program::DataDirective;
use crate::token::SourceLine;
use arch::mem::{MemoryImage, Segment};
use color_print::cformat;

fn header(title: &str) -> String {
    format!(
        "{}+------[{}]{}",
        "-".repeat(19),
        title,
        "-".repeat(45usize.saturating_sub(title.len()))
    )
}

fn code_row(addr: u32, word: Option<u32>, line: &SourceLine) -> String {
    let bin = match word {
        Some(bin) => format!(
            "{:02X} {:02X} {:02X} {:02X}",
            (bin >> 24) & 0xFF,
            (bin >> 16) & 0xFF,
            (bin >> 8) & 0xFF,
            bin & 0xFF
        ),
        None => cformat!("<r,s>!! !! !! !!</>"),
    };
    let (op, rest) = match line.tokens.split_first() {
        Some((op, rest)) => (
            op.kind.to_string(),
            rest.iter()
                .map(|t| t.kind.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        ),
        None => (String::new(), String::new()),
    };
    format!(
        "[{:08X}] {} | {:>4}: {} {}",
        addr,
        bin,
        line.line,
        cformat!("<b>{}</>", op),
        rest
    )
}

fn data_row(addr: u32, data: &DataDirective, mem: &MemoryImage) -> String {
    let size = data.size() as usize;
    let shown = mem.read_bytes(addr, size.min(4));
    let mut bin = shown
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if size > 4 {
        bin.push('+');
    }
    format!(
        "[{:08X}] {:<12}| {:>4}: {}",
        addr,
        bin,
        data.pos.line,
        cformat!("<c>{}</>", data.text.trim())
    )
}

/// Address-ordered listing of every segment, then the label table.
pub fn listing(assembly: &Assembly, mem: &MemoryImage) -> Vec<String> {
    let program = &assembly.program;
    let mut rows = Vec::new();
    for (seg, code) in [(Segment::Text, &program.text), (Segment::KText, &program.ktext)] {
        if code.is_empty() {
            continue;
        }
        rows.push(header(&seg.to_string()));
        for (addr, line) in code {
            rows.push(code_row(*addr, assembly.words.get(addr).copied(), line));
        }
    }
    for (seg, data) in [(Segment::Data, &program.data), (Segment::KData, &program.kdata)] {
        if data.is_empty() {
            continue;
        }
        rows.push(header(&seg.to_string()));
        for (addr, directive) in data {
            rows.push(data_row(*addr, directive, mem));
        }
    }
    if !program.labels.is_empty() {
        rows.push(header("labels"));
        for (name, label) in program.labels.iter() {
            let addr = if label.valid {
                format!("{:08X}", label.addr)
            } else {
                "????????".to_string()
            };
            let scope = if label.global { "global" } else { "" };
            rows.push(format!(
                "[{}] {:12}| {} {}",
                addr,
                "",
                cformat!("<g>{}:</>", name),
                scope
            ));
        }
    }
    rows.push(format!("{}+{}", "-".repeat(19), "-".repeat(53)));
    rows
}

pub fn print_dump(assembly: &Assembly, mem: &MemoryImage) {
    for row in listing(assembly, mem) {
        println!("{}", row);
    }
}
