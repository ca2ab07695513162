mod assignment;
mod common;
mod routing;
