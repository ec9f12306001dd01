mod weigh_tests;
