mod allocation;
mod approval;
mod common;
