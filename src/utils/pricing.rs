/// Human price band for a 1..=4 price level.
pub fn range_text(level: u8) -> &'static str {
    match level {
        1 => "até R$ 30",
        2 => "R$ 30–60",
        3 => "R$ 60–120",
        4 => "R$ 120+",
        _ => "",
    }
}

pub fn symbols(level: u8) -> String {
    "$".repeat(level as usize)
}
