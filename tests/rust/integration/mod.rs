mod coalescing_tests;
mod end_to_end_tests;
mod paging_tests;
