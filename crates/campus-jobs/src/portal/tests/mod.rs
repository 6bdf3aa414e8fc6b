mod catalog;
mod common;
mod notifications;
mod routing;
