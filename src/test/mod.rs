mod db;
mod portfolio;
