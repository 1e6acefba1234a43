pub mod coalesce;
pub mod init;
pub mod scenarios;
