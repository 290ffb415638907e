pub mod sync_controller;
