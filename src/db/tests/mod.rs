mod cases;
mod migrations;
