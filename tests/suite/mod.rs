mod callbacks;
mod composition;
mod config;
mod lifecycle;
mod scenarios;
mod settlement;
