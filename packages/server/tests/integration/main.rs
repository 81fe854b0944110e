mod quiz_list;
mod session;
