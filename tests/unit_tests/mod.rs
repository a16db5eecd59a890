mod blocks;
mod cache;
mod chunk;
mod definition;
