use crate::value_objects::side::Side;

/// What a strategy emits; sizing happens separately via
/// `Strategy::size_position`.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub side: Side,
    pub confidence: f64,
}
