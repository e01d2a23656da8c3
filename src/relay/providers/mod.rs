pub mod newsnow;
