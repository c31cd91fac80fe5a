mod arbitrary;

mod parse_bad;
