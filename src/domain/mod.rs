pub mod avtech;
pub mod models;
pub mod point;
pub mod rpi;
pub mod weather_station;
