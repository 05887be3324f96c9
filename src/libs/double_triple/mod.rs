pub mod double_triple;
