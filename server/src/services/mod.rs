pub mod shot_scanner;
