pub mod column_menu;
pub mod controls;
pub mod debug;
pub mod grid;
