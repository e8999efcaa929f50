pub mod geodesy;
pub mod polyline;
